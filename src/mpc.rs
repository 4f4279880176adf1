//! Read-only view of a multi-point constraint.
//!
//! A slave dof block is algebraically eliminated in favor of a weighted sum
//! of master dofs. Only the topology matters to this crate: which cells
//! carry slaves, and which master scalar dofs each slave block expands to.
//! Coefficients and owning-rank bookkeeping live with the constraint's
//! builder, not here.

use std::sync::Arc;

use crate::dofmap::FunctionSpace;
use crate::graph::AdjacencyList;

/// Topological view of one multi-point constraint on a function space.
#[derive(Clone, Debug)]
pub struct MultiPointConstraint {
    space: Arc<FunctionSpace>,
    /// Locally-owned cell -> slave dof blocks on that cell. Rows cover
    /// exactly the locally-owned cells, in cell order.
    cell_to_slaves: AdjacencyList<i32>,
    /// Slave dof block -> master scalar dof indices, in constraint order.
    masters: AdjacencyList<i32>,
}

impl MultiPointConstraint {
    pub fn new(
        space: Arc<FunctionSpace>,
        cell_to_slaves: AdjacencyList<i32>,
        masters: AdjacencyList<i32>,
    ) -> Self {
        Self {
            space,
            cell_to_slaves,
            masters,
        }
    }

    #[inline]
    pub fn function_space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    /// Cell -> slave blocks over locally-owned cells.
    #[inline]
    pub fn cell_to_slaves(&self) -> &AdjacencyList<i32> {
        &self.cell_to_slaves
    }

    /// Master scalar dofs of slave block `slave`.
    #[inline]
    pub fn masters(&self, slave: i32) -> &[i32] {
        self.masters.links(slave as usize)
    }
}
