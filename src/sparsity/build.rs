//! Augment a baseline finite-element sparsity pattern with the couplings
//! induced by eliminating slave dofs in favor of their masters.
//!
//! Eliminating a slave row makes every master of that slave couple to all
//! trial functions active on any cell the slave participates in, and makes
//! any two masters appearing in the same constraint equation couple to each
//! other. The builder inserts exactly those extra blocks on top of the
//! standard per-cell cross product; it never finalizes the pattern — the
//! caller runs the collective `assemble` once all ranks are done.

use crate::mpc::MultiPointConstraint;
use crate::mpc_error::MpcError;
use crate::sparsity::form::Form;
use crate::sparsity::pattern::SparsityPattern;

/// How the row- and column-axis constraints relate.
///
/// The square/rectangular branch cannot be inferred safely from reference
/// identity alone: when one function space is a strict subspace of the
/// other, either branch could be meant. The caller states the intent
/// explicitly.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CouplingMode {
    /// One constraint drives both axes; every insertion is mirrored so the
    /// resulting pattern is symmetric.
    Symmetric,
    /// Independent row and column constraints; each axis is populated in its
    /// own orientation only, and no cross-axis master-master coupling is
    /// inserted.
    Rectangular,
}

/// Insert the unconstrained per-cell row x column dof-block cross product
/// for every locally-owned cell of the form's integration domain.
pub fn build_standard_pattern<T>(
    pattern: &mut SparsityPattern,
    a: &Form<T>,
) -> Result<(), MpcError> {
    if a.rank() != 2 {
        return Err(MpcError::InvalidFormRank(a.rank()));
    }
    let dofmap0 = a.function_spaces()[0].dofmap();
    let dofmap1 = a.function_spaces()[1].dofmap();
    debug_assert_eq!(dofmap0.num_owned_cells(), dofmap1.num_owned_cells());
    for cell in 0..dofmap0.num_owned_cells() {
        pattern.insert(dofmap0.cell_dofs(cell as i32), dofmap1.cell_dofs(cell as i32))?;
    }
    Ok(())
}

/// Walk one constraint's cells and hand every (master block, cell dofs) and
/// (master, master) pair to the supplied inserters.
fn populate_constraint<F, G>(
    pattern: &mut SparsityPattern,
    mpc: &MultiPointConstraint,
    mpc_off_axis: &MultiPointConstraint,
    inserter: F,
    master_inserter: G,
) -> Result<(), MpcError>
where
    F: Fn(&mut SparsityPattern, &[i32], &[i32]) -> Result<(), MpcError>,
    G: Fn(&mut SparsityPattern, &[i32], &[i32]) -> Result<(), MpcError>,
{
    let bs = mpc.function_space().dofmap().block_size();
    let cell_to_slaves = mpc.cell_to_slaves();
    let off_dofmap = mpc_off_axis.function_space().dofmap();

    for cell in 0..cell_to_slaves.num_nodes() {
        let slaves = cell_to_slaves.links(cell);
        if slaves.is_empty() {
            continue;
        }
        let cell_dofs = off_dofmap.cell_dofs(cell as i32);

        // Flatten all masters of all slaves on this cell to dof blocks;
        // duplicates are kept and absorbed by idempotent insertion.
        let mut flattened_masters = Vec::with_capacity(slaves.len());
        for &slave in slaves {
            for &master in mpc.masters(slave) {
                flattened_masters.push(master / bs);
            }
        }

        for j in 0..flattened_masters.len() {
            let master_block = [flattened_masters[j]];
            inserter(pattern, &master_block, cell_dofs)?;
            // Masters of any slave on this cell become mutually coupled.
            for k in (j + 1)..flattened_masters.len() {
                let other_master_block = [flattened_masters[k]];
                master_inserter(pattern, &other_master_block, &master_block)?;
            }
        }
    }
    Ok(())
}

/// Build the sparsity pattern of a bilinear form whose axes carry the
/// multi-point constraints `mpc0` (rows) and `mpc1` (columns).
///
/// The baseline per-cell pattern is inserted first, then the slave
/// elimination couplings per [`CouplingMode`]. The returned pattern is not
/// finalized; the caller must run the collective
/// [`SparsityPattern::assemble`] before matrix sizing.
///
/// # Errors
/// [`MpcError::InvalidFormRank`] if `a` is not rank 2.
pub fn create_sparsity_pattern<T>(
    a: &Form<T>,
    mpc0: &MultiPointConstraint,
    mpc1: &MultiPointConstraint,
    coupling: CouplingMode,
) -> Result<SparsityPattern, MpcError> {
    log::debug!("generating MPC sparsity pattern ({coupling:?})");
    if a.rank() != 2 {
        return Err(MpcError::InvalidFormRank(a.rank()));
    }

    let dofmap0 = mpc0.function_space().dofmap();
    let dofmap1 = mpc1.function_space().dofmap();
    let mut pattern = SparsityPattern::new(
        [dofmap0.index_map().clone(), dofmap1.index_map().clone()],
        [dofmap0.block_size(), dofmap1.block_size()],
    );

    log::debug!("build standard pattern");
    build_standard_pattern(&mut pattern, a)?;

    log::debug!("build constraint pattern");
    match coupling {
        CouplingMode::Symmetric => {
            // One pass, every insertion mirrored.
            let square_inserter = |p: &mut SparsityPattern, m: &[i32], c: &[i32]| {
                p.insert(m, c)?;
                p.insert(c, m)
            };
            populate_constraint(&mut pattern, mpc0, mpc1, square_inserter, square_inserter)?;
        }
        CouplingMode::Rectangular => {
            // One pass per axis, in that axis's own orientation only.
            let nothing = |_: &mut SparsityPattern, _: &[i32], _: &[i32]| Ok(());
            populate_constraint(
                &mut pattern,
                mpc0,
                mpc1,
                |p, m, c| p.insert(m, c),
                nothing,
            )?;
            populate_constraint(
                &mut pattern,
                mpc1,
                mpc0,
                |p, m, c| p.insert(c, m),
                nothing,
            )?;
        }
    }
    Ok(pattern)
}

/// Square-case convenience: one constraint drives both axes, symmetric
/// coupling.
pub fn create_sparsity_pattern_square<T>(
    a: &Form<T>,
    mpc: &MultiPointConstraint,
) -> Result<SparsityPattern, MpcError> {
    create_sparsity_pattern(a, mpc, mpc, CouplingMode::Symmetric)
}
