//! Thin façade over intra-process (thread mailbox) or inter-process (MPI)
//! message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees). All
//! handles are **waitable**; callers drain every handle before trusting a
//! buffer. The byte-wise all-to-all used by the marker protocol lives here
//! too, expressed over the same trait so it runs against any backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::mpc_error::MpcError;

/// Typed message tag; `base()` yields the wire value. Distinct protocols use
/// distinct tag bases so interleaved exchanges never alias.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    #[inline]
    pub fn base(self) -> u16 {
        self.0
    }
    /// A derived tag for a sub-exchange of the same protocol.
    #[inline]
    pub fn offset(self, k: u16) -> CommTag {
        CommTag(self.0 + k)
    }
}

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// This process's rank in `[0, size)`.
    fn rank(&self) -> usize;
    /// Number of participating processes.
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for pure serial unit tests and single-process
/// runs: rank 0 of 1, no peers to talk to.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- RayonComm: intra-process / multi-thread ---

type Key = (usize, usize, u16); // (src, dst, tag)

/// FIFO per (src, dst, tag) channel so repeated sends keep their order.
static MAILBOX: Lazy<DashMap<Key, VecDeque<Bytes>>> = Lazy::new(DashMap::new);

pub struct LocalHandle {
    buf: Arc<Mutex<Option<Vec<u8>>>>,
    handle: Option<JoinHandle<()>>,
}

impl Wait for LocalHandle {
    fn wait(mut self) -> Option<Vec<u8>> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let mut guard = self.buf.lock().unwrap();
        guard.take()
    }
}

/// In-process backend: each simulated rank owns one `RayonComm`, messages
/// travel through a global mailbox. Tests run several ranks on threads.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
}

impl RayonComm {
    pub fn new(rank: usize, size: usize) -> Self {
        debug_assert!(rank < size);
        Self { rank, size }
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        MAILBOX
            .entry(key)
            .or_default()
            .push_back(Bytes::from(buf.to_vec()));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        let key = (peer, self.rank, tag);
        let buf_arc = Arc::new(Mutex::new(None));
        let buf_arc_clone = buf_arc.clone();
        let buf_len = buf.len();
        let handle = std::thread::spawn(move || {
            loop {
                let popped = MAILBOX.get_mut(&key).and_then(|mut q| q.pop_front());
                if let Some(bytes) = popped {
                    let n = bytes.len().min(buf_len);
                    let mut guard = buf_arc_clone.lock().unwrap();
                    *guard = Some(bytes[..n].to_vec());
                    break;
                }
                std::thread::yield_now();
            }
        });
        LocalHandle {
            buf: buf_arc,
            handle: Some(handle),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---

#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, Wait};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as RawCommunicator, Destination, Source};

    /// Inter-process backend over the MPI world communicator. The caller
    /// must have initialized MPI (`mpi::initialize()`) before construction.
    ///
    /// Sends complete eagerly (small control messages only travel through
    /// this path), so `isend` maps to a blocking send and `irecv` to a
    /// blocking receive that returns an already-completed handle.
    pub struct MpiComm {
        world: SimpleCommunicator,
    }

    impl MpiComm {
        pub fn world() -> Self {
            Self {
                world: SimpleCommunicator::world(),
            }
        }
    }

    pub struct Done(pub Option<Vec<u8>>);

    impl Wait for Done {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = Done;
        type RecvHandle = Done;

        fn rank(&self) -> usize {
            self.world.rank() as usize
        }
        fn size(&self) -> usize {
            self.world.size() as usize
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Done {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag as i32);
            Done(None)
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Done {
            self.world
                .process_at_rank(peer as i32)
                .receive_into_with_tag(buf, tag as i32);
            Done(Some(buf.to_vec()))
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

/// One-byte-per-rank all-to-all: collective, every rank must call it with a
/// `send` buffer of length `comm.size()`.
///
/// Returns the byte received from each rank (own slot copied locally). Cost
/// is O(P) words per rank; there is no central coordinator.
///
/// # Errors
/// [`MpcError::CommFailure`] if a peer delivers a truncated payload.
pub fn all_to_all_bytes<C: Communicator>(
    comm: &C,
    tag: CommTag,
    send: &[u8],
) -> Result<Vec<u8>, MpcError> {
    let size = comm.size();
    let rank = comm.rank();
    debug_assert_eq!(send.len(), size);

    let mut recv = vec![0u8; size];
    recv[rank] = send[rank];

    // Sends first: blocking backends rely on eager completion of these
    // one-byte messages before the receives are posted.
    let mut pending_sends = Vec::with_capacity(size.saturating_sub(1));
    for peer in 0..size {
        if peer != rank {
            pending_sends.push(comm.isend(peer, tag.base(), &send[peer..peer + 1]));
        }
    }

    let mut pending_recvs = Vec::with_capacity(size.saturating_sub(1));
    for peer in 0..size {
        if peer != rank {
            let mut byte = [0u8; 1];
            let h = comm.irecv(peer, tag.base(), &mut byte);
            pending_recvs.push((peer, h));
        }
    }

    for (peer, h) in pending_recvs {
        let data = h
            .wait()
            .ok_or_else(|| MpcError::CommFailure(format!("no payload from rank {peer}")))?;
        if data.len() != 1 {
            return Err(MpcError::CommFailure(format!(
                "expected 1 byte from rank {peer}, got {}",
                data.len()
            )));
        }
        recv[peer] = data[0];
    }
    for s in pending_sends {
        let _ = s.wait();
    }
    Ok(recv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn rayon_round_trip() {
        let tag = CommTag(0x1000);
        let c0 = RayonComm::new(0, 2);
        let c1 = RayonComm::new(1, 2);

        let msg = b"hello";
        let _s = c0.isend(1, tag.base(), msg);

        let mut buf = [0u8; 5];
        let h = c1.irecv(0, tag.base(), &mut buf);
        let got = h.wait().unwrap();
        assert_eq!(&got, msg);
    }

    #[test]
    #[serial]
    fn rayon_fifo_order() {
        let tag = CommTag(0x1001);
        let c0 = RayonComm::new(0, 2);
        let c1 = RayonComm::new(1, 2);

        for i in 0..10u8 {
            c0.isend(1, tag.base(), &[i]);
        }
        let mut out = Vec::new();
        for _ in 0..10 {
            let mut b = [0u8; 1];
            let h = c1.irecv(0, tag.base(), &mut b);
            out.push(h.wait().unwrap()[0]);
        }
        assert_eq!(out, (0u8..10u8).collect::<Vec<_>>());
    }

    #[test]
    #[serial]
    fn all_to_all_three_ranks() {
        let tag = CommTag(0x1002);
        let flags = [1u8, 0, 1];
        let handles: Vec<_> = (0..3)
            .map(|r| {
                std::thread::spawn(move || {
                    let comm = RayonComm::new(r, 3);
                    // every rank broadcasts its own flag to all peers
                    let send = vec![flags[r]; 3];
                    all_to_all_bytes(&comm, tag, &send).unwrap()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), vec![1, 0, 1]);
        }
    }

    #[test]
    fn nocomm_is_isolated() {
        let comm = NoComm;
        let got = all_to_all_bytes(&comm, CommTag(0x1003), &[7]).unwrap();
        assert_eq!(got, vec![7]);
    }
}
