//! Block sparsity pattern over two index maps.
//!
//! Rows cover the locally-owned plus ghost range of the row index map;
//! columns are stored as global block indices so ghost-row contributions can
//! travel to their owner unchanged. `insert` is idempotent (a per-row set),
//! `assemble` is the one collective step: it flushes ghost-row entries to
//! the owning rank and freezes the owned rows into CSR form. Once assembled
//! the pattern is immutable.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::comm::communicator::{CommTag, Communicator, Wait};
use crate::comm::wire::{WireCount, WireEntry, cast_slice, cast_slice_mut};
use crate::dofmap::IndexMap;
use crate::mpc_error::MpcError;

const TAG_FLUSH_SIZE: CommTag = CommTag(0x30);
const TAG_FLUSH_DATA: CommTag = CommTag(0x31);

/// Finalized CSR form of the owned rows.
#[derive(Clone, Debug)]
struct AssembledRows {
    offsets: Vec<usize>,
    /// Global column block indices, sorted within each row.
    cols: Vec<i64>,
}

/// A bipartite row-block -> column-block relation with block sizes
/// `(bs0, bs1)`.
#[derive(Clone, Debug)]
pub struct SparsityPattern {
    index_maps: [Arc<IndexMap>; 2],
    bs: [i32; 2],
    /// Per local row (owned then ghost): set of global column blocks.
    rows: Vec<BTreeSet<i64>>,
    assembled: Option<AssembledRows>,
}

impl SparsityPattern {
    /// An empty, unassembled pattern over the two index maps.
    pub fn new(index_maps: [Arc<IndexMap>; 2], bs: [i32; 2]) -> Self {
        let num_rows = index_maps[0].size_local_with_ghosts() as usize;
        Self {
            index_maps,
            bs,
            rows: vec![BTreeSet::new(); num_rows],
            assembled: None,
        }
    }

    #[inline]
    pub fn index_map(&self, axis: usize) -> &Arc<IndexMap> {
        &self.index_maps[axis]
    }

    #[inline]
    pub fn block_size(&self, axis: usize) -> i32 {
        self.bs[axis]
    }

    /// Insert the cross product `rows x cols` of local block indices.
    ///
    /// Idempotent: re-inserting an existing pair is a no-op. Rows may be
    /// owned or ghost; ghost-row entries are flushed to the owner during
    /// [`assemble`](Self::assemble).
    ///
    /// # Errors
    /// [`MpcError::PatternAssembled`] after finalization, or an
    /// out-of-bounds error for an invalid row/column index.
    pub fn insert(&mut self, rows: &[i32], cols: &[i32]) -> Result<(), MpcError> {
        if self.assembled.is_some() {
            return Err(MpcError::PatternAssembled);
        }
        let num_rows = self.rows.len() as i32;
        let num_cols = self.index_maps[1].size_local_with_ghosts();
        for &col in cols {
            if col < 0 || col >= num_cols {
                return Err(MpcError::SparsityColOutOfBounds { col, num_cols });
            }
        }
        for &row in rows {
            if row < 0 || row >= num_rows {
                return Err(MpcError::SparsityRowOutOfBounds { row, num_rows });
            }
            let set = &mut self.rows[row as usize];
            for &col in cols {
                set.insert(self.index_maps[1].local_to_global(col));
            }
        }
        Ok(())
    }

    /// Whether `(row, global_col)` is present; `row` is a local block index.
    /// Works before and after assembly (ghost rows are empty afterwards).
    pub fn contains(&self, row: i32, global_col: i64) -> bool {
        match &self.assembled {
            None => self.rows[row as usize].contains(&global_col),
            Some(csr) => {
                let r = row as usize;
                if r >= self.index_maps[0].size_local() as usize {
                    return false;
                }
                csr.cols[csr.offsets[r]..csr.offsets[r + 1]]
                    .binary_search(&global_col)
                    .is_ok()
            }
        }
    }

    /// Finalize cross-process contributions and freeze the pattern.
    ///
    /// Collective over `comm`: every rank must call it exactly once, after
    /// all local inserts. Ghost-row entries are sent to the owning rank as
    /// (global row, global column) pairs over the owner->ghost edges implied
    /// by the row index map, then the owned rows become immutable CSR.
    ///
    /// # Errors
    /// [`MpcError::AlreadyAssembled`] on a second call;
    /// [`MpcError::CommFailure`] on a malformed exchange.
    pub fn assemble<C: Communicator>(&mut self, comm: &C) -> Result<(), MpcError> {
        if self.assembled.is_some() {
            return Err(MpcError::AlreadyAssembled);
        }
        let imap0 = &self.index_maps[0];
        let size_local = imap0.size_local();

        // Edges of the flush exchange, from the row index map alone:
        // we send ghost rows to their owners, and receive from every rank
        // that ghosts one of our owned rows.
        let ghost_owners = imap0.owners();
        let mut send_to: Vec<i32> = ghost_owners.to_vec();
        send_to.sort_unstable();
        send_to.dedup();
        let mut recv_from: Vec<i32> = (0..size_local)
            .flat_map(|r| imap0.dest_ranks(r).iter().copied())
            .collect();
        recv_from.sort_unstable();
        recv_from.dedup();
        log::debug!(
            "pattern assemble: rank {} flushing to {} owners, receiving from {} ghosting ranks",
            comm.rank(),
            send_to.len(),
            recv_from.len()
        );

        // Pack ghost-row entries per owner.
        let mut outgoing: Vec<Vec<WireEntry>> = vec![Vec::new(); send_to.len()];
        for ghost in 0..imap0.num_ghosts() {
            let row = size_local + ghost;
            let owner = ghost_owners[ghost as usize];
            let slot = send_to.binary_search(&owner).expect("owner in send set");
            let global_row = imap0.local_to_global(row);
            for &global_col in &self.rows[row as usize] {
                outgoing[slot].push(WireEntry::new(global_row, global_col));
            }
        }

        // Sends first (count, then payload); blocking backends rely on
        // eager completion of these messages before receives are posted.
        let mut pending_sends = Vec::new();
        for (slot, &dest) in send_to.iter().enumerate() {
            let count = WireCount::new(outgoing[slot].len());
            pending_sends.push(comm.isend(
                dest as usize,
                TAG_FLUSH_SIZE.base(),
                cast_slice(std::slice::from_ref(&count)),
            ));
            pending_sends.push(comm.isend(
                dest as usize,
                TAG_FLUSH_DATA.base(),
                cast_slice(&outgoing[slot]),
            ));
        }

        let (range_start, range_end) = imap0.local_range();
        for &src in &recv_from {
            let mut count = WireCount::new(0);
            let h = comm.irecv(
                src as usize,
                TAG_FLUSH_SIZE.base(),
                cast_slice_mut(std::slice::from_mut(&mut count)),
            );
            let got = h
                .wait()
                .ok_or_else(|| MpcError::CommFailure(format!("no size from rank {src}")))?;
            if got.len() != std::mem::size_of::<WireCount>() {
                return Err(MpcError::CommFailure(format!(
                    "malformed size message from rank {src}"
                )));
            }
            // Received buffers carry no alignment guarantee.
            let n = bytemuck::pod_read_unaligned::<WireCount>(&got).get();

            let mut entries = Vec::with_capacity(n);
            if n > 0 {
                let mut raw = vec![0u8; n * std::mem::size_of::<WireEntry>()];
                let h = comm.irecv(src as usize, TAG_FLUSH_DATA.base(), &mut raw);
                let got = h
                    .wait()
                    .ok_or_else(|| MpcError::CommFailure(format!("no data from rank {src}")))?;
                if got.len() != raw.len() {
                    return Err(MpcError::CommFailure(format!(
                        "truncated flush payload from rank {src}"
                    )));
                }
                entries.extend(
                    got.chunks_exact(std::mem::size_of::<WireEntry>())
                        .map(bytemuck::pod_read_unaligned::<WireEntry>),
                );
            } else {
                // Drain the (empty) payload message to keep channels aligned.
                let mut empty: [u8; 0] = [];
                let h = comm.irecv(src as usize, TAG_FLUSH_DATA.base(), &mut empty);
                let _ = h.wait();
            }

            for e in &entries {
                let (grow, gcol) = (e.row(), e.col());
                if grow < range_start || grow >= range_end {
                    return Err(MpcError::CommFailure(format!(
                        "rank {src} flushed row {grow}, outside owned range"
                    )));
                }
                self.rows[(grow - range_start) as usize].insert(gcol);
            }
        }
        for s in pending_sends {
            let _ = s.wait();
        }

        // Freeze owned rows into CSR; ghost rows have been handed off.
        let mut offsets = Vec::with_capacity(size_local as usize + 1);
        offsets.push(0usize);
        let mut cols = Vec::new();
        for row in 0..size_local as usize {
            cols.extend(self.rows[row].iter().copied());
            offsets.push(cols.len());
        }
        self.rows.clear();
        self.assembled = Some(AssembledRows { offsets, cols });
        Ok(())
    }

    /// Global column blocks of owned row `row`, sorted ascending.
    ///
    /// # Errors
    /// [`MpcError::NotAssembled`] before finalization.
    pub fn row(&self, row: i32) -> Result<&[i64], MpcError> {
        let csr = self.assembled.as_ref().ok_or(MpcError::NotAssembled)?;
        let r = row as usize;
        Ok(&csr.cols[csr.offsets[r]..csr.offsets[r + 1]])
    }

    /// Total nonzero blocks over the owned rows.
    ///
    /// # Errors
    /// [`MpcError::NotAssembled`] before finalization.
    pub fn num_nonzeros(&self) -> Result<usize, MpcError> {
        let csr = self.assembled.as_ref().ok_or(MpcError::NotAssembled)?;
        Ok(csr.cols.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::communicator::NoComm;

    fn serial_pattern(n: i32) -> SparsityPattern {
        let im = Arc::new(IndexMap::serial(n));
        SparsityPattern::new([im.clone(), im], [1, 1])
    }

    #[test]
    fn insert_is_idempotent() {
        let mut p = serial_pattern(4);
        p.insert(&[0, 1], &[2]).unwrap();
        p.insert(&[0], &[2]).unwrap();
        p.insert(&[0], &[2, 2]).unwrap();
        p.assemble(&NoComm).unwrap();
        assert_eq!(p.num_nonzeros().unwrap(), 2);
        assert_eq!(p.row(0).unwrap(), &[2]);
        assert_eq!(p.row(1).unwrap(), &[2]);
    }

    #[test]
    fn out_of_bounds_indices_are_rejected() {
        let mut p = serial_pattern(3);
        assert!(matches!(
            p.insert(&[3], &[0]),
            Err(MpcError::SparsityRowOutOfBounds { row: 3, .. })
        ));
        assert!(matches!(
            p.insert(&[0], &[-1]),
            Err(MpcError::SparsityColOutOfBounds { col: -1, .. })
        ));
    }

    #[test]
    fn assemble_is_terminal_and_exactly_once() {
        let mut p = serial_pattern(2);
        p.insert(&[0], &[1]).unwrap();
        p.assemble(&NoComm).unwrap();
        assert_eq!(p.insert(&[0], &[0]), Err(MpcError::PatternAssembled));
        assert_eq!(p.assemble(&NoComm), Err(MpcError::AlreadyAssembled));
    }

    #[test]
    fn queries_require_assembly() {
        let p = serial_pattern(2);
        assert_eq!(p.num_nonzeros(), Err(MpcError::NotAssembled));
        assert_eq!(p.row(0).err(), Some(MpcError::NotAssembled));
    }

    #[test]
    fn contains_tracks_both_states() {
        let mut p = serial_pattern(3);
        p.insert(&[1], &[0, 2]).unwrap();
        assert!(p.contains(1, 0));
        assert!(!p.contains(1, 1));
        p.assemble(&NoComm).unwrap();
        assert!(p.contains(1, 0));
        assert!(p.contains(1, 2));
        assert!(!p.contains(0, 0));
    }
}
