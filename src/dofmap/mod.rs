//! Degree-of-freedom layout: index maps, cell dof lists and entity-closure
//! tables.
//!
//! Everything here is a read-only input to the topology builders. A
//! [`FunctionSpace`] bundles a [`DofMap`]; the dof map carries the dof
//! [`IndexMap`], the block size, the cell -> dof-block adjacency over local
//! and ghost cells, and the element's entity-closure dof table.

pub mod entity_index;
pub mod index_map;

pub use index_map::IndexMap;

use std::sync::Arc;

use crate::graph::AdjacencyList;
use crate::mpc_error::MpcError;

/// Positions into a cell's dof-block list covered by the closure of each
/// local entity, tabulated per entity dimension.
///
/// `closure[dim].links(local_entity)` lists the cell-local dof positions
/// whose geometric support touches that entity.
#[derive(Clone, Debug)]
pub struct ElementDofLayout {
    closure: Vec<AdjacencyList<i32>>,
}

impl ElementDofLayout {
    /// Tables indexed by entity dimension, `closure[d]` keyed by local
    /// entity index within a cell.
    pub fn new(closure: Vec<AdjacencyList<i32>>) -> Self {
        Self { closure }
    }

    /// Cell-local dof positions in the closure of `(dim, local_entity)`.
    pub fn entity_closure_dofs(&self, dim: usize, local_entity: usize) -> Result<&[i32], MpcError> {
        let table = self
            .closure
            .get(dim)
            .filter(|t| local_entity < t.num_nodes())
            .ok_or(MpcError::MissingEntityClosure { dim, local_entity })?;
        Ok(table.links(local_entity))
    }
}

/// Map from cells to dof blocks, plus the dof index map and block size.
#[derive(Clone, Debug)]
pub struct DofMap {
    index_map: Arc<IndexMap>,
    /// Scalar dofs per block.
    block_size: i32,
    /// Cell -> dof blocks, covering locally-owned then ghost cells.
    cell_dofs: AdjacencyList<i32>,
    /// Number of locally-owned cells (a prefix of `cell_dofs`).
    num_owned_cells: usize,
    layout: ElementDofLayout,
}

impl DofMap {
    pub fn new(
        index_map: Arc<IndexMap>,
        block_size: i32,
        cell_dofs: AdjacencyList<i32>,
        num_owned_cells: usize,
        layout: ElementDofLayout,
    ) -> Self {
        debug_assert!(num_owned_cells <= cell_dofs.num_nodes());
        Self {
            index_map,
            block_size,
            cell_dofs,
            num_owned_cells,
            layout,
        }
    }

    #[inline]
    pub fn index_map(&self) -> &Arc<IndexMap> {
        &self.index_map
    }

    /// Scalar dofs per dof block.
    #[inline]
    pub fn block_size(&self) -> i32 {
        self.block_size
    }

    /// Dof blocks of cell `cell` (local or ghost).
    #[inline]
    pub fn cell_dofs(&self, cell: i32) -> &[i32] {
        self.cell_dofs.links(cell as usize)
    }

    /// Total number of cells covered by the dof map (owned + ghost).
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cell_dofs.num_nodes()
    }

    /// Number of locally-owned cells.
    #[inline]
    pub fn num_owned_cells(&self) -> usize {
        self.num_owned_cells
    }

    #[inline]
    pub fn element_dof_layout(&self) -> &ElementDofLayout {
        &self.layout
    }
}

/// A function space: the dof layout the constraint and sparsity builders
/// consume. Basis tabulation lives elsewhere; only the dof topology matters
/// here.
#[derive(Clone, Debug)]
pub struct FunctionSpace {
    dofmap: Arc<DofMap>,
}

impl FunctionSpace {
    pub fn new(dofmap: Arc<DofMap>) -> Self {
        Self { dofmap }
    }

    #[inline]
    pub fn dofmap(&self) -> &Arc<DofMap> {
        &self.dofmap
    }
}
