//! Fixed, little-endian wire types for the pattern-assembly exchange.

use bytemuck::{Pod, Zeroable};

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

pub fn cast_slice_from<T: Pod>(v: &[u8]) -> &[T] {
    bytemuck::cast_slice(v)
}

/// Count of following records. Little-endian on the wire.
#[repr(transparent)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireCount {
    n_le: u64,
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u64).to_le(),
        }
    }
    pub fn get(self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

/// One off-process sparsity contribution: a (global row, global column)
/// block pair.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireEntry {
    row_le: i64,
    col_le: i64,
}

impl WireEntry {
    pub fn new(row: i64, col: i64) -> Self {
        Self {
            row_le: row.to_le(),
            col_le: col.to_le(),
        }
    }
    pub fn row(self) -> i64 {
        i64::from_le(self.row_le)
    }
    pub fn col(self) -> i64 {
        i64::from_le(self.col_le)
    }
}
