//! Process-to-process communication: backends and neighborhood topologies.

pub mod communicator;
pub mod neighborhood;
pub mod wire;

pub use communicator::{CommTag, Communicator, NoComm, RayonComm, Wait};
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
pub use neighborhood::{
    Neighborhood, create_neighborhood_comms, create_owner_to_ghost_comm,
};
