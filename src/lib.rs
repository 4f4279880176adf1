//! # mpc-topology
//!
//! Distributed-memory communication topology and sparse-matrix nonzero
//! structure for finite-element systems with linear multi-point constraints:
//! every "slave" dof is replaced by a linear combination of "master" dofs,
//! possibly owned by another process than the slave or the cell using it.
//!
//! ## Features
//! - Compressed adjacency lists with a two-pass counting-sort builder
//! - Dof-block to facet/cell entity indices over local and ghost data
//! - Neighborhood (directed process-graph) construction from marker flags
//!   or from index-map ownership, with no central coordinator
//! - Sparsity-pattern augmentation for slave-to-master elimination, square
//!   and rectangular
//! - Pluggable communication backends (serial, in-process threads, MPI)
//!
//! ## Determinism
//!
//! All builds are deterministic for fixed input: adjacency rows keep
//! insertion order, block-to-cell lookups tie-break on the lowest cell
//! index, and neighborhood edge lists are emitted in rank order.
//!
//! ## Usage
//! Add `mpc-topology` as a dependency and enable features as needed:
//!
//! ```toml
//! [dependencies]
//! mpc-topology = "0.2"
//! # Optional features:
//! # features = ["mpi-support"]
//! ```
//!
//! Out of scope, handled by external collaborators: basis tabulation,
//! point location, mesh-topology computation, and numerical assembly.

pub mod comm;
pub mod dofmap;
pub mod graph;
pub mod mpc;
pub mod mpc_error;
pub mod sparsity;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::comm::communicator::{CommTag, Communicator, NoComm, RayonComm, Wait};
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::communicator::MpiComm;
    pub use crate::comm::neighborhood::{
        Neighborhood, create_neighborhood_comms, create_owner_to_ghost_comm,
    };
    pub use crate::dofmap::entity_index::{
        MeshConnectivity, compute_shared_indices, create_block_to_cell_map,
        create_block_to_facet_map,
    };
    pub use crate::dofmap::{DofMap, ElementDofLayout, FunctionSpace, IndexMap};
    pub use crate::graph::{AdjacencyBuilder, AdjacencyList};
    pub use crate::mpc::MultiPointConstraint;
    pub use crate::mpc_error::MpcError;
    pub use crate::sparsity::{
        CouplingMode, Form, SparsityPattern, build_standard_pattern, create_sparsity_pattern,
        create_sparsity_pattern_square,
    };
}
