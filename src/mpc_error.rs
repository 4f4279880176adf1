//! MpcError: Unified error type for mpc-topology public APIs
//!
//! This error type is used throughout the crate to provide robust,
//! non-panicking error handling for all public APIs. Malformed-topology
//! variants signal corrupt upstream mesh data; callers should abort rather
//! than continue, since a pattern built from bad connectivity is silently
//! wrong.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for mpc-topology operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MpcError {
    /// A sparsity pattern can only be created for a bilinear (rank-2) form.
    #[error("cannot create sparsity pattern: form has rank {0}, expected 2")]
    InvalidFormRank(usize),
    /// A boundary entity must be adjacent to exactly one cell.
    #[error("entity {entity} adjoins {count} cells (boundary entity must adjoin exactly 1)")]
    EntityCellMultiplicity { entity: i32, count: usize },
    /// An entity was not found in the entity list of its reported cell.
    #[error("entity {entity} not found among the entities of cell {cell}")]
    EntityNotInCell { entity: i32, cell: i32 },
    /// A dof block queried for its cell is not referenced by any cell.
    #[error("dof block {0} is not referenced by any local or ghost cell")]
    BlockWithoutCell(i32),
    /// The element dof layout has no closure table for the requested entity.
    #[error("no entity-closure dofs for dimension {dim}, local entity {local_entity}")]
    MissingEntityClosure { dim: usize, local_entity: usize },
    /// Offsets passed to an adjacency list were not monotone or did not
    /// start at zero.
    #[error("adjacency offsets invalid: {0}")]
    InvalidAdjacencyOffsets(String),
    /// Offsets and data lengths of an adjacency list disagree.
    #[error("adjacency data length {data_len} does not match final offset {last_offset}")]
    AdjacencyLengthMismatch { data_len: usize, last_offset: usize },
    /// A row index passed to `SparsityPattern::insert` was out of range.
    #[error("sparsity row {row} out of range (local + ghost rows: {num_rows})")]
    SparsityRowOutOfBounds { row: i32, num_rows: i32 },
    /// A column index passed to `SparsityPattern::insert` was out of range.
    #[error("sparsity column {col} out of range (local + ghost columns: {num_cols})")]
    SparsityColOutOfBounds { col: i32, num_cols: i32 },
    /// Insertion attempted after the pattern was finalized.
    #[error("sparsity pattern is assembled; no further inserts are valid")]
    PatternAssembled,
    /// `assemble` called twice, or a query requires a finalized pattern.
    #[error("sparsity pattern already assembled")]
    AlreadyAssembled,
    /// A query was made on a pattern that has not been finalized yet.
    #[error("sparsity pattern not assembled yet")]
    NotAssembled,
    /// A ghost index referenced an owner rank outside the communicator.
    #[error("ghost {ghost} names owner rank {owner}, communicator size is {size}")]
    GhostOwnerOutOfRange { ghost: i32, owner: i32, size: usize },
    /// A point-to-point exchange failed or returned a truncated payload.
    #[error("communication failure: {0}")]
    CommFailure(String),
}
