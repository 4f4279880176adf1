//! Flat compressed adjacency list plus its two-pass counting-sort builder.
//!
//! `AdjacencyList` stores a mapping from an integer key in `[0, n)` to an
//! ordered sequence of values as `n + 1` monotone offsets and one flat data
//! array; `links(i)` is the slice `[offsets[i], offsets[i+1])`. The builder
//! produces it in exactly two linear passes over the same logical input:
//! count degrees, prefix-sum into offsets, then scatter each value through a
//! per-key write cursor. No per-key dynamic growth, O(total values) time.

use crate::mpc_error::MpcError;

/// Immutable compressed adjacency: offsets + flat data.
///
/// Row contents keep their insertion order; nothing is sorted behind the
/// caller's back.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AdjacencyList<T> {
    data: Vec<T>,
    offsets: Vec<i32>,
}

impl<T> Default for AdjacencyList<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            offsets: vec![0],
        }
    }
}

impl<T> AdjacencyList<T> {
    /// Build from raw parts, validating the offset invariants.
    ///
    /// # Errors
    /// Returns [`MpcError::InvalidAdjacencyOffsets`] if `offsets` is empty,
    /// does not start at zero, or is not monotone non-decreasing, and
    /// [`MpcError::AdjacencyLengthMismatch`] if `data.len() != offsets[n]`.
    pub fn new(data: Vec<T>, offsets: Vec<i32>) -> Result<Self, MpcError> {
        match offsets.first() {
            None => {
                return Err(MpcError::InvalidAdjacencyOffsets(
                    "offsets must have length >= 1".into(),
                ));
            }
            Some(&first) if first != 0 => {
                return Err(MpcError::InvalidAdjacencyOffsets(format!(
                    "offsets[0] = {first}, expected 0"
                )));
            }
            _ => {}
        }
        if let Some(w) = offsets.windows(2).find(|w| w[1] < w[0]) {
            return Err(MpcError::InvalidAdjacencyOffsets(format!(
                "offsets decrease from {} to {}",
                w[0], w[1]
            )));
        }
        let last = *offsets.last().unwrap() as usize;
        if data.len() != last {
            return Err(MpcError::AdjacencyLengthMismatch {
                data_len: data.len(),
                last_offset: last,
            });
        }
        Ok(Self { data, offsets })
    }

    /// An adjacency with `n` keys and no values.
    pub fn empty(n: usize) -> Self {
        Self {
            data: Vec::new(),
            offsets: vec![0; n + 1],
        }
    }

    /// Number of keys (rows).
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Values attached to key `i`, in insertion order.
    #[inline]
    pub fn links(&self, i: usize) -> &[T] {
        let lo = self.offsets[i] as usize;
        let hi = self.offsets[i + 1] as usize;
        &self.data[lo..hi]
    }

    /// Number of values attached to key `i`.
    #[inline]
    pub fn num_links(&self, i: usize) -> usize {
        (self.offsets[i + 1] - self.offsets[i]) as usize
    }

    /// The raw offset array (length `num_nodes() + 1`).
    #[inline]
    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    /// The flat data array (length `offsets[num_nodes()]`).
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Iterate `(key, links)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[T])> + '_ {
        (0..self.num_nodes()).map(move |i| (i, self.links(i)))
    }
}

/// Two-pass counting-sort builder for [`AdjacencyList`].
///
/// Usage mirrors the two scans over the input:
/// 1. call [`count`](Self::count) once per value during the first scan,
/// 2. call [`finalize_counts`](Self::finalize_counts),
/// 3. call [`insert`](Self::insert) with the same keys during the second
///    scan,
/// 4. call [`build`](Self::build).
///
/// The cursor array doubles as the count buffer and is reset to zero between
/// the passes, so peak scratch space is O(num_keys).
#[derive(Debug)]
pub struct AdjacencyBuilder<T> {
    offsets: Vec<i32>,
    cursor: Vec<i32>,
    data: Vec<T>,
    finalized: bool,
}

impl<T: Copy + Default> AdjacencyBuilder<T> {
    /// Builder for keys in `[0, num_keys)`.
    pub fn new(num_keys: usize) -> Self {
        Self {
            offsets: vec![0; num_keys + 1],
            cursor: vec![0; num_keys],
            data: Vec::new(),
            finalized: false,
        }
    }

    /// Pass 1: record one value for `key`.
    #[inline]
    pub fn count(&mut self, key: usize) {
        debug_assert!(!self.finalized, "count after finalize_counts");
        self.cursor[key] += 1;
    }

    /// Prefix-sum the counts into offsets, allocate the data array and reset
    /// the per-key cursors for the scatter pass.
    pub fn finalize_counts(&mut self) {
        debug_assert!(!self.finalized);
        for i in 0..self.cursor.len() {
            self.offsets[i + 1] = self.offsets[i] + self.cursor[i];
        }
        self.data = vec![T::default(); *self.offsets.last().unwrap() as usize];
        self.cursor.fill(0);
        self.finalized = true;
    }

    /// Pass 2: scatter `value` into the next free slot of `key`.
    #[inline]
    pub fn insert(&mut self, key: usize, value: T) {
        debug_assert!(self.finalized, "insert before finalize_counts");
        let pos = self.offsets[key] + self.cursor[key];
        self.data[pos as usize] = value;
        self.cursor[key] += 1;
    }

    /// Finish, consuming the builder.
    ///
    /// Debug builds assert that pass 2 replayed exactly the values counted in
    /// pass 1.
    pub fn build(self) -> AdjacencyList<T> {
        debug_assert!(self.finalized, "build before finalize_counts");
        debug_assert!(
            self.cursor
                .iter()
                .enumerate()
                .all(|(i, &c)| self.offsets[i] + c == self.offsets[i + 1]),
            "pass 2 did not replay the values counted in pass 1"
        );
        AdjacencyList {
            data: self.data,
            offsets: self.offsets,
        }
    }
}
