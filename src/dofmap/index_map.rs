//! Per-process partitioning of a global index space into owned and ghost
//! ranges.
//!
//! Owned indices occupy `[0, size_local)`, ghosts occupy
//! `[size_local, size_local + num_ghosts)`. For every ghost the owning rank
//! is known; for every owned index the set of remote ranks that hold it as a
//! ghost ("destination ranks") is stored as a compressed adjacency. The map
//! is a long-lived input owned by the caller; this crate never mutates it.

use crate::graph::AdjacencyList;
use crate::mpc_error::MpcError;

/// Read-only owned/ghost partitioning of one index space.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct IndexMap {
    size_local: i32,
    /// First global index owned by this rank.
    local_range_start: i64,
    /// Global index of each ghost, in ghost order.
    ghosts: Vec<i64>,
    /// Owning rank of each ghost, parallel to `ghosts`.
    ghost_owners: Vec<i32>,
    /// Owned local index -> remote ranks holding it as a ghost.
    dest_ranks: AdjacencyList<i32>,
}

impl IndexMap {
    /// Assemble an index map from its parts.
    ///
    /// `dest_ranks` must have exactly `size_local` rows and `ghosts` and
    /// `ghost_owners` must be parallel arrays.
    pub fn new(
        size_local: i32,
        local_range_start: i64,
        ghosts: Vec<i64>,
        ghost_owners: Vec<i32>,
        dest_ranks: AdjacencyList<i32>,
    ) -> Result<Self, MpcError> {
        if dest_ranks.num_nodes() != size_local as usize {
            return Err(MpcError::InvalidAdjacencyOffsets(format!(
                "dest_ranks has {} rows, expected size_local = {size_local}",
                dest_ranks.num_nodes()
            )));
        }
        if ghosts.len() != ghost_owners.len() {
            return Err(MpcError::AdjacencyLengthMismatch {
                data_len: ghost_owners.len(),
                last_offset: ghosts.len(),
            });
        }
        Ok(Self {
            size_local,
            local_range_start,
            ghosts,
            ghost_owners,
            dest_ranks,
        })
    }

    /// A serial map: `n` owned indices, no ghosts, no destinations.
    pub fn serial(n: i32) -> Self {
        Self {
            size_local: n,
            local_range_start: 0,
            ghosts: Vec::new(),
            ghost_owners: Vec::new(),
            dest_ranks: AdjacencyList::empty(n as usize),
        }
    }

    /// Number of indices owned by this rank.
    #[inline]
    pub fn size_local(&self) -> i32 {
        self.size_local
    }

    /// Number of ghost indices on this rank.
    #[inline]
    pub fn num_ghosts(&self) -> i32 {
        self.ghosts.len() as i32
    }

    /// Owned-plus-ghost extent of the local index range.
    #[inline]
    pub fn size_local_with_ghosts(&self) -> i32 {
        self.size_local + self.num_ghosts()
    }

    /// Global range `[start, end)` owned by this rank.
    #[inline]
    pub fn local_range(&self) -> (i64, i64) {
        (
            self.local_range_start,
            self.local_range_start + self.size_local as i64,
        )
    }

    /// Owning rank per ghost, in ghost order.
    #[inline]
    pub fn owners(&self) -> &[i32] {
        &self.ghost_owners
    }

    /// Global index per ghost, in ghost order.
    #[inline]
    pub fn ghosts(&self) -> &[i64] {
        &self.ghosts
    }

    /// Remote ranks holding owned index `local` as a ghost.
    ///
    /// # Panics
    /// Panics if `local >= size_local` (destination ranks exist for owned
    /// indices only).
    #[inline]
    pub fn dest_ranks(&self, local: i32) -> &[i32] {
        self.dest_ranks.links(local as usize)
    }

    /// The full owned-index -> destination-ranks adjacency.
    #[inline]
    pub fn index_to_dest_ranks(&self) -> &AdjacencyList<i32> {
        &self.dest_ranks
    }

    /// Map a local index (owned or ghost) to its global index.
    #[inline]
    pub fn local_to_global(&self, local: i32) -> i64 {
        if local < self.size_local {
            self.local_range_start + local as i64
        } else {
            self.ghosts[(local - self.size_local) as usize]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_map_has_no_ghosts() {
        let im = IndexMap::serial(5);
        assert_eq!(im.size_local(), 5);
        assert_eq!(im.num_ghosts(), 0);
        assert_eq!(im.local_range(), (0, 5));
        assert_eq!(im.local_to_global(3), 3);
        assert!(im.dest_ranks(0).is_empty());
    }

    #[test]
    fn ghost_globals_resolve() {
        let dest = AdjacencyList::new(vec![1, 2], vec![0, 2, 2]).unwrap();
        let im = IndexMap::new(2, 10, vec![4, 7], vec![0, 2], dest).unwrap();
        assert_eq!(im.size_local_with_ghosts(), 4);
        assert_eq!(im.local_to_global(1), 11);
        assert_eq!(im.local_to_global(2), 4);
        assert_eq!(im.local_to_global(3), 7);
        assert_eq!(im.owners(), &[0, 2]);
        assert_eq!(im.dest_ranks(0), &[1, 2]);
    }

    #[test]
    fn mismatched_parts_are_rejected() {
        let dest = AdjacencyList::empty(1);
        assert!(IndexMap::new(2, 0, vec![], vec![], dest.clone()).is_err());
        assert!(IndexMap::new(1, 0, vec![9], vec![], dest).is_err());
    }
}
