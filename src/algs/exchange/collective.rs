//! Collective byte exchange between workers.
//!
//! Every worker taking part calls [`CollectiveExchange::exchange`] once per
//! field exchange with the same symmetric peer relation: if `p` is in my
//! peer set, I am in `p`'s. The call blocks until every peer has been heard
//! from or has failed; failed peers are simply absent from the result.

use crate::algs::communicator::{Communicator, ExchangeCommTags, Wait};
use crate::algs::wire::{WireCount, WireStamp, cast_slice, expect_exact_len};
use crate::mesh_error::MeshHaloError;
use bytes::Bytes;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::mem::size_of;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

/// Capability to swap byte buffers with a fixed set of peer workers.
pub trait CollectiveExchange {
    fn rank(&self) -> usize;

    /// Send `outgoing[p]` to each `p` in `peers` (an empty message if absent)
    /// and return what each peer sent back.
    ///
    /// Per-peer failures are logged and leave the peer out of the result;
    /// an `Err` is reserved for failures of the whole exchange.
    fn exchange(
        &self,
        outgoing: BTreeMap<usize, Bytes>,
        peers: &BTreeSet<usize>,
    ) -> Result<BTreeMap<usize, Bytes>, MeshHaloError>;
}

/// Single-worker exchange: there is never anybody to talk to.
#[derive(Copy, Clone, Debug, Default)]
pub struct LocalExchange;

impl CollectiveExchange for LocalExchange {
    fn rank(&self) -> usize {
        0
    }

    fn exchange(
        &self,
        _outgoing: BTreeMap<usize, Bytes>,
        peers: &BTreeSet<usize>,
    ) -> Result<BTreeMap<usize, Bytes>, MeshHaloError> {
        if !peers.is_empty() {
            log::debug!("local exchange has no transport for peers {peers:?}");
        }
        Ok(BTreeMap::new())
    }
}

/// Two-stage exchange over a point-to-point [`Communicator`]: message sizes
/// first, then payloads sized from stage one.
///
/// Every message is stamped with the exchange epoch, a counter advanced by
/// each call. A peer that answers after this worker gave up on it leaves
/// messages behind; the next call sees an older epoch and drops them instead
/// of scattering last step's data. Keep one `CommExchange` per worker for
/// the whole run so the epochs of all workers advance together.
#[derive(Debug)]
pub struct CommExchange<C> {
    comm: C,
    tags: ExchangeCommTags,
    epoch: AtomicU32,
}

impl<C: Communicator> CommExchange<C> {
    pub fn new(comm: C, tags: ExchangeCommTags) -> Self {
        Self {
            comm,
            tags,
            epoch: AtomicU32::new(0),
        }
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Wait on `handle` for the message of `epoch` from `p`, reposting the
    /// receive past leftovers of earlier epochs.
    fn recv_stamped(
        &self,
        p: usize,
        tag: u16,
        epoch: u32,
        capacity: usize,
        mut handle: C::RecvHandle,
    ) -> Result<Vec<u8>, MeshHaloError> {
        let fail = |message: String| MeshHaloError::CommError {
            neighbor: p,
            message,
        };
        loop {
            let data = handle
                .wait()
                .ok_or_else(|| fail(format!("nothing received on tag {tag}")))?;
            let (stamp, body) = WireStamp::split(&data)?;
            match stamp.epoch().cmp(&epoch) {
                Ordering::Equal => {
                    expect_exact_len(body.len(), stamp.body_len()).map_err(fail)?;
                    return Ok(body.to_vec());
                }
                Ordering::Less => {
                    log::debug!(
                        "dropping stale message from worker {p} (epoch {} < {epoch})",
                        stamp.epoch()
                    );
                    let mut buf = vec![0u8; capacity];
                    handle = self.comm.irecv(p, tag, &mut buf);
                }
                Ordering::Greater => {
                    return Err(fail(format!(
                        "message from epoch {} while at epoch {epoch}",
                        stamp.epoch()
                    )));
                }
            }
        }
    }

    /// Symmetric size handshake. Every handle is drained before returning.
    fn exchange_sizes(
        &self,
        outgoing: &BTreeMap<usize, Bytes>,
        peers: &BTreeSet<usize>,
        epoch: u32,
    ) -> BTreeMap<usize, usize> {
        let tag = self.tags.sizes.as_u16();
        let header = size_of::<WireStamp>() + size_of::<WireCount>();
        let mut pending_recvs = Vec::with_capacity(peers.len());
        for &p in peers {
            let mut buf = vec![0u8; header];
            pending_recvs.push((p, self.comm.irecv(p, tag, &mut buf)));
        }

        let mut pending_sends = Vec::with_capacity(peers.len());
        for &p in peers {
            let n = outgoing.get(&p).map_or(0, Bytes::len);
            let count = WireCount::new(n);
            let msg = WireStamp::new(epoch, size_of::<WireCount>())
                .prepend(cast_slice(std::slice::from_ref(&count)));
            pending_sends.push(self.comm.isend(p, tag, &msg));
        }

        let mut sizes = BTreeMap::new();
        for (p, h) in pending_recvs {
            match self.recv_stamped(p, tag, epoch, header, h) {
                Ok(body) if body.len() == size_of::<WireCount>() => {
                    let cnt: WireCount = bytemuck::pod_read_unaligned(&body);
                    sizes.insert(p, cnt.get());
                }
                Ok(body) => log::debug!(
                    "{}",
                    MeshHaloError::CommError {
                        neighbor: p,
                        message: format!(
                            "expected {} bytes for size header, got {}",
                            size_of::<WireCount>(),
                            body.len()
                        ),
                    }
                ),
                Err(e) => log::debug!("no size header: {e}"),
            }
        }

        for s in pending_sends {
            let _ = s.wait();
        }
        sizes
    }
}

impl<C: Communicator> CollectiveExchange for CommExchange<C> {
    fn rank(&self) -> usize {
        self.comm.rank()
    }

    fn exchange(
        &self,
        outgoing: BTreeMap<usize, Bytes>,
        peers: &BTreeSet<usize>,
    ) -> Result<BTreeMap<usize, Bytes>, MeshHaloError> {
        let epoch = self.epoch.fetch_add(1, AtomicOrdering::Relaxed);
        let sizes = self.exchange_sizes(&outgoing, peers, epoch);
        let tag = self.tags.data.as_u16();

        let mut pending_recvs = Vec::new();
        for (&p, &n) in sizes.iter().filter(|(_, n)| **n > 0) {
            let capacity = size_of::<WireStamp>() + n;
            let mut buf = vec![0u8; capacity];
            let h = self.comm.irecv(p, tag, &mut buf);
            pending_recvs.push((p, n, capacity, h));
        }

        let mut pending_sends = Vec::new();
        for &p in peers {
            if let Some(buf) = outgoing.get(&p).filter(|b| !b.is_empty()) {
                let msg = WireStamp::new(epoch, buf.len()).prepend(buf);
                pending_sends.push(self.comm.isend(p, tag, &msg));
            }
        }

        let mut received = BTreeMap::new();
        for (p, n, capacity, h) in pending_recvs {
            match self.recv_stamped(p, tag, epoch, capacity, h) {
                Ok(data) => match expect_exact_len(data.len(), n) {
                    Ok(()) => {
                        received.insert(p, Bytes::from(data));
                    }
                    Err(e) => log::debug!("dropping payload from worker {p}: {e}"),
                },
                Err(e) => log::debug!("no payload: {e}"),
            }
        }

        for s in pending_sends {
            let _ = s.wait();
        }
        Ok(received)
    }
}

#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::Count;
    use mpi::datatype::{Partition, PartitionMut};
    use mpi::traits::{Communicator as _, CommunicatorCollectives};

    /// Collective exchange over an MPI communicator, using an all-to-all of
    /// byte counts followed by a variable-count all-to-all of payloads.
    ///
    /// Every rank of the communicator must call `exchange`, even one with no
    /// peers.
    pub struct MpiExchange<W> {
        world: W,
    }

    impl<W> MpiExchange<W>
    where
        W: mpi::traits::Communicator + CommunicatorCollectives,
    {
        pub fn new(world: W) -> Self {
            Self { world }
        }
    }

    fn displacements(counts: &[Count]) -> Vec<Count> {
        counts
            .iter()
            .scan(0, |acc, &c| {
                let d = *acc;
                *acc += c;
                Some(d)
            })
            .collect()
    }

    impl<W> CollectiveExchange for MpiExchange<W>
    where
        W: mpi::traits::Communicator + CommunicatorCollectives,
    {
        fn rank(&self) -> usize {
            self.world.rank() as usize
        }

        fn exchange(
            &self,
            outgoing: BTreeMap<usize, Bytes>,
            peers: &BTreeSet<usize>,
        ) -> Result<BTreeMap<usize, Bytes>, MeshHaloError> {
            let size = self.world.size() as usize;
            let mut send_counts: Vec<Count> = vec![0; size];
            let mut send_buf = Vec::new();
            for p in 0..size {
                let Some(b) = outgoing.get(&p).filter(|_| peers.contains(&p)) else {
                    continue;
                };
                send_counts[p] = Count::try_from(b.len()).map_err(|_| MeshHaloError::CommError {
                    neighbor: p,
                    message: format!("payload of {} bytes exceeds the MPI count range", b.len()),
                })?;
                send_buf.extend_from_slice(b);
            }

            let mut recv_counts: Vec<Count> = vec![0; size];
            self.world
                .all_to_all_into(&send_counts[..], &mut recv_counts[..]);

            let send_displs = displacements(&send_counts);
            let recv_displs = displacements(&recv_counts);
            let total: usize = recv_counts.iter().map(|&c| c as usize).sum();
            let mut recv_buf = vec![0u8; total];
            {
                let send = Partition::new(&send_buf[..], &send_counts[..], &send_displs[..]);
                let mut recv =
                    PartitionMut::new(&mut recv_buf[..], &recv_counts[..], &recv_displs[..]);
                self.world.all_to_all_varcount_into(&send, &mut recv);
            }

            let recv_buf = Bytes::from(recv_buf);
            let mut received = BTreeMap::new();
            for &p in peers {
                let n = recv_counts.get(p).copied().unwrap_or(0) as usize;
                if n == 0 {
                    continue;
                }
                let at = recv_displs[p] as usize;
                received.insert(p, recv_buf.slice(at..at + n));
            }
            Ok(received)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiExchange;
