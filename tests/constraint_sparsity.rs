//! Constrained sparsity patterns on a two-cell mesh.
//!
//! Geometry used throughout: two cells sharing a facet, P1-like dof blocks,
//! block size 1. Cell 0 carries blocks [0, 1, 2], cell 1 carries
//! [1, 2, 3]; blocks 1 and 2 sit on the shared facet.

use std::sync::Arc;

use mpc_topology::prelude::*;

fn space(num_blocks: i32, cell_dofs: AdjacencyList<i32>) -> Arc<FunctionSpace> {
    let num_cells = cell_dofs.num_nodes();
    let dofmap = DofMap::new(
        Arc::new(IndexMap::serial(num_blocks)),
        1,
        cell_dofs,
        num_cells,
        ElementDofLayout::new(vec![]),
    );
    Arc::new(FunctionSpace::new(Arc::new(dofmap)))
}

fn two_cell_space(num_blocks: i32) -> Arc<FunctionSpace> {
    space(
        num_blocks,
        AdjacencyList::new(vec![0, 1, 2, 1, 2, 3], vec![0, 3, 6]).unwrap(),
    )
}

/// Slave block 1 (on the shared facet) constrained to the given master
/// scalar dofs.
fn slave_on_shared_facet(v: &Arc<FunctionSpace>, masters: &[i32]) -> MultiPointConstraint {
    let num_blocks = v.dofmap().index_map().size_local() as usize;
    let cell_to_slaves = AdjacencyList::new(vec![1, 1], vec![0, 1, 2]).unwrap();
    // only block 1 has masters
    let mut offsets = vec![0i32; num_blocks + 1];
    for o in offsets.iter_mut().skip(2) {
        *o = masters.len() as i32;
    }
    let master_adj = AdjacencyList::new(masters.to_vec(), offsets).unwrap();
    MultiPointConstraint::new(v.clone(), cell_to_slaves, master_adj)
}

fn unconstrained(v: &Arc<FunctionSpace>) -> MultiPointConstraint {
    let num_cells = v.dofmap().num_owned_cells();
    let num_blocks = v.dofmap().index_map().size_local() as usize;
    MultiPointConstraint::new(
        v.clone(),
        AdjacencyList::empty(num_cells),
        AdjacencyList::empty(num_blocks),
    )
}

#[test]
fn rejects_non_bilinear_forms() {
    let v = two_cell_space(4);
    let a: Form<f64> = Form::with_rank(1, vec![v.clone()]);
    let mpc = unconstrained(&v);
    let err = create_sparsity_pattern_square(&a, &mpc).unwrap_err();
    assert_eq!(err, MpcError::InvalidFormRank(1));
}

/// Scenario: one slave block on the shared facet, two master blocks
/// elsewhere (blocks 0 and 3). The constrained pattern must contain every
/// (master, trial dof) pair for both cells' trial dofs, the two masters
/// coupled to each other, and the whole baseline pattern.
#[test]
fn slave_on_shared_facet_couples_masters_to_both_cells() {
    let v = two_cell_space(4);
    let a: Form<f64> = Form::bilinear(v.clone(), v.clone());
    let mpc = slave_on_shared_facet(&v, &[0, 3]);

    let mut pattern = create_sparsity_pattern_square(&a, &mpc).unwrap();

    // baseline, computed independently
    let mut baseline = SparsityPattern::new(
        [
            v.dofmap().index_map().clone(),
            v.dofmap().index_map().clone(),
        ],
        [1, 1],
    );
    build_standard_pattern(&mut baseline, &a).unwrap();

    // superset of the baseline
    for row in 0..4 {
        for col in 0..4i64 {
            if baseline.contains(row, col) {
                assert!(
                    pattern.contains(row, col),
                    "baseline entry ({row},{col}) missing"
                );
            }
        }
    }
    // every (master, trial dof) pair, both cells' trial dofs
    for &master in &[0i32, 3] {
        for col in 0..4i64 {
            assert!(pattern.contains(master, col), "({master},{col}) missing");
        }
    }
    // the two masters couple to each other, both orientations
    assert!(pattern.contains(0, 3));
    assert!(pattern.contains(3, 0));
    // square case: symmetric overall
    for row in 0..4 {
        for col in 0..4i64 {
            assert_eq!(pattern.contains(row, col), pattern.contains(col as i32, row as i64));
        }
    }

    pattern.assemble(&NoComm).unwrap();
    assert_eq!(pattern.num_nonzeros().unwrap(), 16);
}

/// Masters living on no cell of the slave (blocks 4 and 5 of a widened
/// space) make the square/rectangular difference observable.
#[test]
fn rectangular_mode_inserts_one_orientation_only() {
    let v = two_cell_space(6);
    let a: Form<f64> = Form::bilinear(v.clone(), v.clone());
    let mpc0 = slave_on_shared_facet(&v, &[4, 5]);
    let mpc1 = unconstrained(&v);

    let sym = create_sparsity_pattern(&a, &mpc0, &mpc0, CouplingMode::Symmetric).unwrap();
    let rect = create_sparsity_pattern(&a, &mpc0, &mpc1, CouplingMode::Rectangular).unwrap();

    // both orientations and the master-master pair in the square case
    assert!(sym.contains(4, 0));
    assert!(sym.contains(0, 4));
    assert!(sym.contains(4, 5));
    assert!(sym.contains(5, 4));

    // rectangular: masters become rows against the cell dofs, nothing more
    assert!(rect.contains(4, 0));
    assert!(rect.contains(4, 3));
    assert!(!rect.contains(0, 4), "mirrored orientation must be absent");
    assert!(!rect.contains(4, 5), "cross-axis master-master must be absent");
    assert!(!rect.contains(5, 4));
}

/// Duplicate flattened master entries never inflate the pattern: two slaves
/// sharing a master yield the same pattern as the deduplicated constraint.
#[test]
fn duplicate_masters_do_not_inflate() {
    let v = two_cell_space(4);
    let a: Form<f64> = Form::bilinear(v.clone(), v.clone());

    // blocks 1 and 2 both slaved to master scalar 0; both sit on both cells,
    // so master 0 is flattened four times per cell pass
    let cell_to_slaves = AdjacencyList::new(vec![1, 2, 1, 2], vec![0, 2, 4]).unwrap();
    let masters = AdjacencyList::new(vec![0, 0], vec![0, 0, 1, 2, 2]).unwrap();
    let mpc = MultiPointConstraint::new(v.clone(), cell_to_slaves, masters);

    let mut pattern = create_sparsity_pattern_square(&a, &mpc).unwrap();
    pattern.assemble(&NoComm).unwrap();

    // master 0 couples to all dofs of both cells; with the baseline this is
    // exactly the dense 4x4 block pattern, 16 unique entries
    assert_eq!(pattern.num_nonzeros().unwrap(), 16);
}
