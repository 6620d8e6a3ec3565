//! Thin façade over intra-process message passing between workers.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! All handles are **waitable** but non-blocking: the collective exchange
//! calls `.wait()` before it trusts that a buffer is ready.

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Typed message tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(transparent)]
pub struct CommTag(u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        CommTag(tag)
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Tag `by` steps after this one (wrapping).
    pub const fn offset(self, by: u16) -> Self {
        CommTag(self.0.wrapping_add(by))
    }
}

/// Tags for the two stages of a collective exchange.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExchangeCommTags {
    pub sizes: CommTag,
    pub data: CommTag,
}

impl ExchangeCommTags {
    pub const fn from_base(base: CommTag) -> Self {
        Self {
            sizes: base,
            data: base.offset(1),
        }
    }
}

/// Non-blocking communication interface.
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;
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

/// Single-worker communicator: every receive comes back empty.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }
}

// --- RayonComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)

static MAILBOX: Lazy<DashMap<Key, VecDeque<Bytes>>> = Lazy::new(DashMap::new);
static POSTED: Lazy<(Mutex<u64>, Condvar)> = Lazy::new(|| (Mutex::new(0), Condvar::new()));

fn take_message(key: &Key) -> Option<Bytes> {
    let mut slot = MAILBOX.get_mut(key)?;
    let msg = slot.pop_front();
    let drained = slot.is_empty();
    drop(slot);
    if drained {
        MAILBOX.remove_if(key, |_, q| q.is_empty());
    }
    msg
}

/// Pending receive from the in-process mailbox.
pub struct LocalHandle {
    key: Key,
    deadline: Instant,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let (lock, cvar) = &*POSTED;
        loop {
            if let Some(bytes) = take_message(&self.key) {
                return Some(bytes.to_vec());
            }
            let now = Instant::now();
            if now >= self.deadline {
                log::debug!(
                    "receive from worker {} (tag {}) timed out",
                    self.key.0,
                    self.key.2
                );
                return None;
            }
            let mut guard = lock.lock();
            // re-check under the lock so a post between the two cannot be missed
            if MAILBOX.contains_key(&self.key) {
                continue;
            }
            let slice = (self.deadline - now).min(Duration::from_millis(5));
            cvar.wait_for(&mut guard, slice);
        }
    }
}

/// Workers simulated as threads of one process, sharing a global mailbox.
///
/// Messages are queued per `(src, dst, tag)`, so repeated exchanges with the
/// same tag are delivered in order.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    timeout: Duration,
}

impl RayonComm {
    pub fn new(rank: usize, size: usize) -> Self {
        Self {
            rank,
            size,
            timeout: Duration::from_secs(10),
        }
    }

    /// Give up on a receive after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        MAILBOX
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        let (lock, cvar) = &*POSTED;
        *lock.lock() += 1;
        cvar.notify_all();
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            key: (peer, self.rank, tag),
            deadline: Instant::now() + self.timeout,
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }
}
