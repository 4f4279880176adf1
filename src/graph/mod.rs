//! Compressed adjacency structures shared by every other subsystem.

pub mod adjacency;

pub use adjacency::{AdjacencyBuilder, AdjacencyList};
