//! Minimal view of a variational form: its rank and function spaces.
//!
//! The scalar type of the eventual matrix is a phantom parameter only; it
//! never threads through adjacency or communicator construction.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::dofmap::FunctionSpace;

/// A form of arbitrary rank over one function space per axis.
#[derive(Clone, Debug)]
pub struct Form<T> {
    rank: usize,
    spaces: Vec<Arc<FunctionSpace>>,
    _scalar: PhantomData<T>,
}

impl<T> Form<T> {
    /// A bilinear (rank-2) form over test space `v` and trial space `u`.
    pub fn bilinear(v: Arc<FunctionSpace>, u: Arc<FunctionSpace>) -> Self {
        Self {
            rank: 2,
            spaces: vec![v, u],
            _scalar: PhantomData,
        }
    }

    /// A form of explicit rank; used for linear/functional forms and for
    /// rank validation paths.
    pub fn with_rank(rank: usize, spaces: Vec<Arc<FunctionSpace>>) -> Self {
        Self {
            rank,
            spaces,
            _scalar: PhantomData,
        }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn function_spaces(&self) -> &[Arc<FunctionSpace>] {
        &self.spaces
    }
}
