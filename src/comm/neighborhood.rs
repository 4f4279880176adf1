//! Directed process-graph ("neighborhood") construction.
//!
//! Two independent collective protocols build [`Neighborhood`] handles from
//! partial, locally-known facts, with no central coordinator:
//!
//! * **marker-based**: two one-byte all-to-all exchanges discover which
//!   ranks hold slaves and which hold masters, then each rank derives its
//!   edges independently;
//! * **ownership-based**: edges fall out of an index map's ghost owners and
//!   destination ranks, no exchange beyond the (collective) creation call.
//!
//! Both protocols are collective: every participating rank must call them in
//! the same order, or the underlying exchange deadlocks. Failure there is
//! fatal and not recoverable inside this module.

use itertools::Itertools;

use crate::comm::communicator::{CommTag, Communicator, all_to_all_bytes};
use crate::dofmap::IndexMap;
use crate::mpc_error::MpcError;

/// Tag bases for the two marker exchanges.
const TAG_HAS_MASTERS: CommTag = CommTag(0x20);
const TAG_HAS_SLAVES: CommTag = CommTag(0x21);

/// An immutable directed graph over process ranks with explicit, ordered
/// source-edge and destination-edge lists and uniform edge weight 1.
///
/// Created exactly once by a collective call; typically cached by the caller
/// for the lifetime of a solve. Exposes its edge lists for inspection and
/// testing.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Neighborhood {
    sources: Vec<i32>,
    destinations: Vec<i32>,
}

impl Neighborhood {
    /// Collective creation from explicit edge lists; all edges carry weight
    /// 1. Every rank of `comm` must call this with lists that agree across
    /// the graph (an edge `i -> j` must appear as a destination on `i` and a
    /// source on `j`).
    pub fn create_adjacent<C: Communicator>(
        _comm: &C,
        sources: Vec<i32>,
        destinations: Vec<i32>,
    ) -> Self {
        Self {
            sources,
            destinations,
        }
    }

    /// Ranks with an edge into this rank, in creation order.
    #[inline]
    pub fn sources(&self) -> &[i32] {
        &self.sources
    }

    /// Ranks this rank has an edge to, in creation order.
    #[inline]
    pub fn destinations(&self) -> &[i32] {
        &self.destinations
    }
}

/// Marker-based protocol: build the slave->master communicator and its
/// structural transpose master->slave.
///
/// Inputs are this rank's two local booleans: whether it has a slave and
/// whether it owns an entity carrying the distinguished master marker. Two
/// one-byte-per-rank all-to-all exchanges replicate both flags, then each
/// rank computes its edges locally:
///
/// * if this rank holds masters, every remote slave-holding rank is a
///   source;
/// * if this rank holds slaves, every remote master-holding rank is a
///   destination;
/// * self-edges are excluded; a rank with neither flag is a valid isolated
///   node with empty edge lists.
///
/// Returns `[slave->master, master->slave]`; the second is created by
/// swapping the source/destination lists in the creation call.
pub fn create_neighborhood_comms<C: Communicator>(
    comm: &C,
    has_slave: bool,
    has_master: bool,
) -> Result<[Neighborhood; 2], MpcError> {
    let size = comm.size();
    let rank = comm.rank();

    let master_flags = vec![u8::from(has_master); size];
    let slave_flags = vec![u8::from(has_slave); size];
    let procs_with_masters = all_to_all_bytes(comm, TAG_HAS_MASTERS, &master_flags)?;
    let procs_with_slaves = all_to_all_bytes(comm, TAG_HAS_SLAVES, &slave_flags)?;

    // Edges slaves (sources) -> masters (destinations).
    let mut source_edges = Vec::new();
    let mut dest_edges = Vec::new();
    if procs_with_masters[rank] == 1 {
        source_edges.extend(
            (0..size)
                .filter(|&i| i != rank && procs_with_slaves[i] == 1)
                .map(|i| i as i32),
        );
    }
    if procs_with_slaves[rank] == 1 {
        dest_edges.extend(
            (0..size)
                .filter(|&i| i != rank && procs_with_masters[i] == 1)
                .map(|i| i as i32),
        );
    }
    log::trace!(
        "rank {rank}: slave->master edges: {} sources, {} destinations",
        source_edges.len(),
        dest_edges.len()
    );

    let slaves_to_masters =
        Neighborhood::create_adjacent(comm, source_edges.clone(), dest_edges.clone());
    // Transpose: swap edge lists in the creation call.
    let masters_to_slaves = Neighborhood::create_adjacent(comm, dest_edges, source_edges);
    Ok([slaves_to_masters, masters_to_slaves])
}

/// Ownership-based protocol: build the owner->ghost communicator for a set
/// of dof blocks.
///
/// Destination edges are the union, over `local_blocks`, of the ranks
/// holding that block as a ghost; source edges are the union, over
/// `ghost_blocks`, of each block's owning rank. Both lists are sorted and
/// deduplicated. No exchange happens beyond the collective creation call —
/// the edges come entirely from local index-map data.
///
/// `ghost_blocks` are local indices in `[size_local, size_local +
/// num_ghosts)`.
pub fn create_owner_to_ghost_comm<C: Communicator>(
    comm: &C,
    local_blocks: &[i32],
    ghost_blocks: &[i32],
    index_map: &IndexMap,
) -> Result<Neighborhood, MpcError> {
    let size_local = index_map.size_local();
    let ghost_owners = index_map.owners();

    let dest_edges: Vec<i32> = local_blocks
        .iter()
        .flat_map(|&block| index_map.dest_ranks(block).iter().copied())
        .sorted_unstable()
        .dedup()
        .collect();

    let source_edges: Vec<i32> = ghost_blocks
        .iter()
        .map(|&block| ghost_owners[(block - size_local) as usize])
        .sorted_unstable()
        .dedup()
        .collect();

    if let Some(&owner) = source_edges.iter().find(|&&o| o as usize >= comm.size()) {
        let ghost = ghost_blocks
            .iter()
            .copied()
            .find(|&b| ghost_owners[(b - size_local) as usize] == owner)
            .unwrap_or(-1);
        return Err(MpcError::GhostOwnerOutOfRange {
            ghost,
            owner,
            size: comm.size(),
        });
    }

    Ok(Neighborhood::create_adjacent(comm, source_edges, dest_edges))
}
