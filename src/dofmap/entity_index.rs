//! Adjacency from dof blocks to the mesh entities that reference them.
//!
//! Both maps here are two-pass counting-sort builds (see
//! [`crate::graph::AdjacencyBuilder`]): count incidences per block, prefix
//! sum, re-scan and scatter. Complexity is linear in the total number of
//! incidences; no communication is performed.

use std::sync::Arc;

use crate::dofmap::FunctionSpace;
use crate::graph::{AdjacencyBuilder, AdjacencyList};
use crate::mpc_error::MpcError;

/// Precomputed entity <-> cell connectivity for one entity dimension.
///
/// Borrowed read-only from the mesh topology; assumed complete for all local
/// and ghost cells.
#[derive(Clone, Debug)]
pub struct MeshConnectivity {
    /// Entity -> adjoining cells.
    entity_to_cell: Arc<AdjacencyList<i32>>,
    /// Cell -> its entities of this dimension, in cell-local order.
    cell_to_entity: Arc<AdjacencyList<i32>>,
}

impl MeshConnectivity {
    pub fn new(entity_to_cell: Arc<AdjacencyList<i32>>, cell_to_entity: Arc<AdjacencyList<i32>>) -> Self {
        Self {
            entity_to_cell,
            cell_to_entity,
        }
    }

    #[inline]
    pub fn entity_to_cell(&self) -> &AdjacencyList<i32> {
        &self.entity_to_cell
    }

    #[inline]
    pub fn cell_to_entity(&self) -> &AdjacencyList<i32> {
        &self.cell_to_entity
    }
}

/// Map every dof block (local + ghost) to the boundary entities of dimension
/// `dim` whose closure touches it.
///
/// For each input entity the unique adjoining cell is found, the entity's
/// local index inside that cell is located by linear search, and the
/// entity-closure dof blocks are gathered from the cell dof list.
///
/// # Errors
/// - [`MpcError::EntityCellMultiplicity`] if an entity adjoins other than
///   exactly one cell: the input is then not a boundary entity set, and the
///   upstream topology is corrupt.
/// - [`MpcError::EntityNotInCell`] if an entity is missing from its reported
///   cell's entity list.
pub fn create_block_to_facet_map(
    space: &FunctionSpace,
    conn: &MeshConnectivity,
    dim: usize,
    entities: &[i32],
) -> Result<AdjacencyList<i32>, MpcError> {
    let dofmap = space.dofmap();
    let imap = dofmap.index_map();
    let num_blocks = imap.size_local_with_ghosts() as usize;

    let e_to_c = conn.entity_to_cell();
    let c_to_e = conn.cell_to_entity();

    // Resolve each entity to (cell, local index) once; reused in both passes.
    let mut cells = Vec::with_capacity(entities.len());
    let mut local_indices = Vec::with_capacity(entities.len());
    for &entity in entities {
        let adjoining = e_to_c.links(entity as usize);
        if adjoining.len() != 1 {
            return Err(MpcError::EntityCellMultiplicity {
                entity,
                count: adjoining.len(),
            });
        }
        let cell = adjoining[0];
        let local_entity = c_to_e
            .links(cell as usize)
            .iter()
            .position(|&e| e == entity)
            .ok_or(MpcError::EntityNotInCell { entity, cell })?;
        cells.push(cell);
        local_indices.push(local_entity);
    }

    // Pass 1: count entities touching each block.
    let mut builder = AdjacencyBuilder::new(num_blocks);
    for (i, &cell) in cells.iter().enumerate() {
        let cell_blocks = dofmap.cell_dofs(cell);
        let closure = dofmap
            .element_dof_layout()
            .entity_closure_dofs(dim, local_indices[i])?;
        for &pos in closure {
            builder.count(cell_blocks[pos as usize] as usize);
        }
    }
    builder.finalize_counts();

    // Pass 2: scatter entity indices.
    for (i, &cell) in cells.iter().enumerate() {
        let cell_blocks = dofmap.cell_dofs(cell);
        let closure = dofmap
            .element_dof_layout()
            .entity_closure_dofs(dim, local_indices[i])?;
        for &pos in closure {
            builder.insert(cell_blocks[pos as usize] as usize, entities[i]);
        }
    }
    Ok(builder.build())
}

/// Build the full block -> cells adjacency over all local and ghost cells.
///
/// Each block's row lists the cells touching it in increasing cell index,
/// since cells are scanned in order in both passes.
pub fn create_block_to_cell_adjacency(space: &FunctionSpace) -> AdjacencyList<i32> {
    let dofmap = space.dofmap();
    let num_blocks = dofmap.index_map().size_local_with_ghosts() as usize;
    let num_cells = dofmap.num_cells();

    let mut builder = AdjacencyBuilder::new(num_blocks);
    for cell in 0..num_cells {
        for &block in dofmap.cell_dofs(cell as i32) {
            builder.count(block as usize);
        }
    }
    builder.finalize_counts();
    for cell in 0..num_cells {
        for &block in dofmap.cell_dofs(cell as i32) {
            builder.insert(block as usize, cell as i32);
        }
    }
    builder.build()
}

/// For each queried dof block, return one cell containing it: the first cell
/// in the block's adjacency row, i.e. the lowest-index cell touching the
/// block. Deterministic for fixed input.
///
/// # Errors
/// [`MpcError::BlockWithoutCell`] if a queried block is not referenced by any
/// local or ghost cell.
pub fn create_block_to_cell_map(
    space: &FunctionSpace,
    blocks: &[i32],
) -> Result<Vec<i32>, MpcError> {
    let block_to_cells = create_block_to_cell_adjacency(space);
    let mut cells = Vec::with_capacity(blocks.len());
    for &block in blocks {
        let row = block_to_cells.links(block as usize);
        let cell = *row.first().ok_or(MpcError::BlockWithoutCell(block))?;
        cells.push(cell);
    }
    Ok(cells)
}

/// The full owned-index -> destination-ranks adjacency of a space's dof
/// index map: which remote ranks ghost each owned dof block.
pub fn compute_shared_indices(space: &FunctionSpace) -> AdjacencyList<i32> {
    space.dofmap().index_map().index_to_dest_ranks().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dofmap::{DofMap, ElementDofLayout, IndexMap};

    /// Two triangles sharing edge 2:
    ///   cell 0: vertices/blocks [0, 1, 2], edges [0, 1, 2]
    ///   cell 1: blocks [1, 2, 3], edges [2, 3, 4]
    /// P1 layout: the closure of local edge e covers the two vertex dofs
    /// opposite to it; here we use {e, (e+1)%3} positions for simplicity.
    fn two_triangle_space() -> (FunctionSpace, MeshConnectivity) {
        let imap = Arc::new(IndexMap::serial(4));
        let cell_dofs = AdjacencyList::new(vec![0, 1, 2, 1, 2, 3], vec![0, 3, 6]).unwrap();
        // closure positions per local edge (dim 1): edge e -> dof positions
        let edge_closure = AdjacencyList::new(vec![0, 1, 1, 2, 0, 2], vec![0, 2, 4, 6]).unwrap();
        let layout = ElementDofLayout::new(vec![
            AdjacencyList::empty(3), // dim 0 unused here
            edge_closure,
        ]);
        let dofmap = Arc::new(DofMap::new(imap, 1, cell_dofs, 2, layout));
        let space = FunctionSpace::new(dofmap);

        // edge -> cells: edges 0,1 on cell 0; edge 2 shared; edges 3,4 on cell 1
        let e_to_c =
            AdjacencyList::new(vec![0, 0, 0, 1, 1, 1], vec![0, 1, 2, 4, 5, 6]).unwrap();
        let c_to_e = AdjacencyList::new(vec![0, 1, 2, 2, 3, 4], vec![0, 3, 6]).unwrap();
        let conn = MeshConnectivity::new(Arc::new(e_to_c), Arc::new(c_to_e));
        (space, conn)
    }

    #[test]
    fn block_to_facet_counts_boundary_edges() {
        let (space, conn) = two_triangle_space();
        // boundary edges only: 0, 1 (cell 0) and 3, 4 (cell 1)
        let adj = create_block_to_facet_map(&space, &conn, 1, &[0, 1, 3, 4]).unwrap();
        assert_eq!(adj.num_nodes(), 4);
        // edge 0 closure -> positions {0,1} -> blocks {0,1};
        // edge 1 -> positions {1,2} -> blocks {1,2};
        // edge 3 (local 1 in cell 1) -> blocks {2,3};
        // edge 4 (local 2 in cell 1) -> blocks {1,3}
        assert_eq!(adj.links(0), &[0]);
        assert_eq!(adj.links(1), &[0, 1, 4]);
        assert_eq!(adj.links(2), &[1, 3]);
        assert_eq!(adj.links(3), &[3, 4]);
    }

    #[test]
    fn shared_facet_is_rejected() {
        let (space, conn) = two_triangle_space();
        let err = create_block_to_facet_map(&space, &conn, 1, &[2]).unwrap_err();
        assert_eq!(
            err,
            MpcError::EntityCellMultiplicity {
                entity: 2,
                count: 2
            }
        );
    }

    #[test]
    fn entity_missing_from_cell_is_rejected() {
        let (space, _) = two_triangle_space();
        // edge 5 claims to adjoin cell 0, but cell 0 lists edges [0,1,2]
        let e_to_c = AdjacencyList::new(vec![0; 6], vec![0, 1, 2, 3, 4, 5, 6]).unwrap();
        let c_to_e = AdjacencyList::new(vec![0, 1, 2, 2, 3, 4], vec![0, 3, 6]).unwrap();
        let conn = MeshConnectivity::new(Arc::new(e_to_c), Arc::new(c_to_e));
        let err = create_block_to_facet_map(&space, &conn, 1, &[5]).unwrap_err();
        assert_eq!(err, MpcError::EntityNotInCell { entity: 5, cell: 0 });
    }

    #[test]
    fn block_to_cell_picks_lowest_cell() {
        let (space, _) = two_triangle_space();
        // blocks 1 and 2 sit on both cells; first scan hit is cell 0
        let cells = create_block_to_cell_map(&space, &[0, 1, 2, 3]).unwrap();
        assert_eq!(cells, vec![0, 0, 0, 1]);
        // repeat call is bit-identical
        let again = create_block_to_cell_map(&space, &[0, 1, 2, 3]).unwrap();
        assert_eq!(cells, again);
    }

    #[test]
    fn unreferenced_block_errors() {
        // widen the index map so block 7 exists but no cell touches it
        let wide = Arc::new(DofMap::new(
            Arc::new(IndexMap::serial(8)),
            1,
            AdjacencyList::new(vec![0, 1, 2, 1, 2, 3], vec![0, 3, 6]).unwrap(),
            2,
            ElementDofLayout::new(vec![]),
        ));
        let space = FunctionSpace::new(wide);
        let err = create_block_to_cell_map(&space, &[7]).unwrap_err();
        assert_eq!(err, MpcError::BlockWithoutCell(7));
    }
}
