//! Recency tracking for LRU eviction.
//!
//! The entry map itself is sharded; only the access order lives behind this
//! single mutex. Every critical section here is O(1) and never touches the
//! entry map, so the lock order is always map shard -> recency.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::credit::fingerprint::Fingerprint;

/// An entry pushed out of the recency order, with the stamp it was last
/// touched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Victim {
    pub fingerprint: Fingerprint,
    pub stamp: u64,
}

pub(crate) struct RecencyTracker {
    order: Mutex<LruCache<Fingerprint, u64>>,
    next_stamp: AtomicU64,
}

impl RecencyTracker {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            order: Mutex::new(LruCache::new(capacity)),
            next_stamp: AtomicU64::new(1),
        }
    }

    /// Mark `fingerprint` most recently used.
    ///
    /// Returns the new stamp and, when the order was full, the least
    /// recently used entry that was pushed out.
    pub fn touch(&self, fingerprint: Fingerprint) -> (u64, Option<Victim>) {
        let stamp = self.next_stamp.fetch_add(1, Ordering::Relaxed);
        let pushed_out = self.lock().push(fingerprint, stamp);
        let victim = match pushed_out {
            Some((key, old)) if key != fingerprint => Some(Victim {
                fingerprint: key,
                stamp: old,
            }),
            _ => None,
        };
        (stamp, victim)
    }

    pub fn forget(&self, fingerprint: &Fingerprint) {
        self.lock().pop(fingerprint);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Fingerprint, u64>> {
        // No user code runs under this lock, so poisoning cannot leave the
        // order half-updated.
        self.order.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
