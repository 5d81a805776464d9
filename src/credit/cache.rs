//! The credit cache.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::schema::CacheConfig;
use crate::credit::entry::{Credit, Slot};
use crate::credit::error::{BoxError, CreditError, CreditResult};
use crate::credit::fingerprint::Fingerprint;
use crate::credit::recency::{RecencyTracker, Victim};
use crate::observability::metrics;

struct CacheInner {
    entries: DashMap<Fingerprint, Slot>,
    /// Per-key gates serializing supplier loads for missing fingerprints.
    loads: DashMap<Fingerprint, Arc<Mutex<()>>>,
    recency: RecencyTracker,
    capacity: NonZeroUsize,
    batch_size: i64,
}

/// A bounded, thread-safe map from fingerprint to remaining credit.
///
/// Cloning is cheap and yields a handle to the same cache.
///
/// # Concurrency
/// Every per-key compound step (insert-if-absent, read-decrement-evict,
/// overwrite) runs under the write lock of the map shard owning the key, so
/// operations on one fingerprint are linearizable and operations on keys in
/// other shards proceed in parallel. No caller code runs under a shard lock.
/// Capacity eviction only removes a victim whose recency stamp is unchanged
/// since it was chosen; a victim touched in the meantime stays.
#[derive(Clone)]
pub struct CreditCache {
    inner: Arc<CacheInner>,
}

impl CreditCache {
    /// Create a cache holding at most `capacity` fingerprints, seeding each
    /// with `batch_size` credit.
    ///
    /// Both values are clamped to at least 1.
    pub fn new(capacity: usize, batch_size: i64) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                loads: DashMap::new(),
                recency: RecencyTracker::new(capacity),
                capacity,
                batch_size: batch_size.max(1),
            }),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.batch_size)
    }

    /// May a request with this fingerprint bypass the backend?
    ///
    /// A miss leaves a zero-credit placeholder behind.
    pub fn has_credit(&self, fingerprint: &Fingerprint) -> bool {
        let (available, inserted, victim) = match self.inner.entries.entry(*fingerprint) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                let victim = self.touch(fingerprint, slot);
                (slot.credit.is_available(), false, victim)
            }
            Entry::Vacant(vacant) => {
                let mut slot = vacant.insert(Slot::placeholder());
                (false, true, self.touch(fingerprint, &mut slot))
            }
        };
        self.evict(victim);
        if inserted {
            self.record_size();
        }
        metrics::record_credit_check(available);
        available
    }

    /// Like [`has_credit`](Self::has_credit), but a miss asks `supplier` for
    /// the initial credit instead of installing a placeholder.
    ///
    /// Racing callers for the same missing key wait on a per-key gate, so
    /// the supplier runs once; callers for other keys never wait on it. If it
    /// fails the error is returned, nothing is cached, and the next waiter
    /// tries its own supplier. A batch seeded while the supplier runs wins
    /// over the loaded value. The supplier may use the cache for other keys
    /// but must not load the same key again.
    pub fn has_credit_with<F, E>(&self, fingerprint: &Fingerprint, supplier: F) -> CreditResult<bool>
    where
        F: FnOnce() -> Result<i64, E>,
        E: Into<BoxError>,
    {
        if let Some(available) = self.check_present(fingerprint) {
            return Ok(available);
        }

        loop {
            let gate = self
                .inner
                .loads
                .entry(*fingerprint)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            let _loading = gate.lock().unwrap_or_else(PoisonError::into_inner);

            // A gate released by a failed load is stale; queue on the new one.
            if !self.gate_is_current(fingerprint, &gate) {
                continue;
            }

            // Another loader may have finished while we waited.
            if let Some(available) = self.check_present(fingerprint) {
                self.release_gate(fingerprint, &gate);
                return Ok(available);
            }

            let credit = match supplier() {
                Ok(initial) => Credit::batch(initial),
                Err(e) => {
                    self.release_gate(fingerprint, &gate);
                    let e: BoxError = e.into();
                    tracing::warn!(
                        fingerprint = %fingerprint.short(),
                        error = %e,
                        "Credit supplier failed"
                    );
                    return Err(CreditError::Load(e));
                }
            };

            let (available, victim) = {
                let mut slot = self
                    .inner
                    .entries
                    .entry(*fingerprint)
                    .or_insert_with(Slot::placeholder);
                if slot.credit == Credit::Placeholder {
                    slot.credit = credit;
                }
                let victim = self.touch(fingerprint, &mut slot);
                (slot.credit.is_available(), victim)
            };
            self.release_gate(fingerprint, &gate);
            self.evict(victim);
            self.record_size();
            metrics::record_credit_check(available);
            return Ok(available);
        }
    }

    /// Install a fresh batch after a successful backend authorization,
    /// overwriting whatever was there.
    pub fn seed(&self, fingerprint: &Fingerprint) {
        self.seed_with(fingerprint, self.inner.batch_size);
    }

    /// Install a batch of `batch_size` credit. A non-positive size installs
    /// a placeholder.
    pub fn seed_with(&self, fingerprint: &Fingerprint, batch_size: i64) {
        let victim = {
            let mut slot = self
                .inner
                .entries
                .entry(*fingerprint)
                .or_insert_with(Slot::placeholder);
            slot.credit = Credit::batch(batch_size);
            self.touch(fingerprint, &mut slot)
        };
        tracing::debug!(fingerprint = %fingerprint.short(), batch_size, "Credit seeded");
        self.evict(victim);
        metrics::record_seed();
        self.record_size();
    }

    /// Remove any entry for `fingerprint`. Absent keys are a no-op.
    pub fn invalidate(&self, fingerprint: &Fingerprint) {
        let removed = self.inner.entries.remove_if(fingerprint, |key, _| {
            self.inner.recency.forget(key);
            true
        });
        if removed.is_some() {
            tracing::debug!(fingerprint = %fingerprint.short(), "Credit invalidated");
            metrics::record_eviction("invalidated");
            self.record_size();
        }
    }

    /// Atomically read and decrement the credit for `fingerprint`, returning
    /// the value seen before the decrement.
    ///
    /// A positive return means the caller may bypass the backend. Once the
    /// entry is exhausted (the observed value is 1 or less) it is removed in
    /// the same step, and the next lookup starts from a fresh placeholder. A
    /// missing key observes 0 and leaves nothing behind.
    pub fn decrement_and_check(&self, fingerprint: &Fingerprint) -> i64 {
        let (observed, removed, victim) = match self.inner.entries.entry(*fingerprint) {
            Entry::Occupied(mut occupied) => {
                let observed = occupied.get().credit.value();
                if observed <= 1 {
                    self.inner.recency.forget(fingerprint);
                    occupied.remove();
                    (observed, true, None)
                } else {
                    let slot = occupied.get_mut();
                    slot.credit = Credit::Active(observed - 1);
                    (observed, false, self.touch(fingerprint, slot))
                }
            }
            // A placeholder would be inserted and exhausted in one step.
            Entry::Vacant(_) => (0, false, None),
        };
        if removed {
            tracing::debug!(fingerprint = %fingerprint.short(), observed, "Credit exhausted");
            metrics::record_eviction("exhausted");
            self.record_size();
        }
        self.evict(victim);
        observed
    }

    /// Current credit for `fingerprint` without affecting recency.
    pub fn remaining(&self, fingerprint: &Fingerprint) -> Option<Credit> {
        self.inner.entries.get(fingerprint).map(|slot| slot.credit)
    }

    /// Number of cached fingerprints, placeholders included.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity.get()
    }

    pub fn batch_size(&self) -> i64 {
        self.inner.batch_size
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.entries.retain(|key, _| {
            self.inner.recency.forget(key);
            false
        });
        self.record_size();
    }

    /// Touch an existing entry and report its availability; `None` if absent.
    fn check_present(&self, fingerprint: &Fingerprint) -> Option<bool> {
        let (available, victim) = match self.inner.entries.entry(*fingerprint) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                let victim = self.touch(fingerprint, slot);
                (slot.credit.is_available(), victim)
            }
            Entry::Vacant(_) => return None,
        };
        self.evict(victim);
        metrics::record_credit_check(available);
        Some(available)
    }

    fn gate_is_current(&self, fingerprint: &Fingerprint, gate: &Arc<Mutex<()>>) -> bool {
        self.inner
            .loads
            .get(fingerprint)
            .is_some_and(|current| Arc::ptr_eq(current.value(), gate))
    }

    /// Drop the load gate for `fingerprint` if it is still `gate`.
    fn release_gate(&self, fingerprint: &Fingerprint, gate: &Arc<Mutex<()>>) {
        self.inner
            .loads
            .remove_if(fingerprint, |_, current| Arc::ptr_eq(current, gate));
    }

    /// Stamp `slot` as most recently used. Must be called with the key's
    /// shard locked; the returned victim must be evicted after unlocking.
    fn touch(&self, fingerprint: &Fingerprint, slot: &mut Slot) -> Option<Victim> {
        let (stamp, victim) = self.inner.recency.touch(*fingerprint);
        slot.stamp = stamp;
        victim
    }

    fn evict(&self, victim: Option<Victim>) {
        let Some(victim) = victim else {
            return;
        };
        let removed = self
            .inner
            .entries
            .remove_if(&victim.fingerprint, |_, slot| slot.stamp == victim.stamp);
        if removed.is_some() {
            tracing::debug!(fingerprint = %victim.fingerprint.short(), "Credit evicted (capacity)");
            metrics::record_eviction("capacity");
            self.record_size();
        }
    }

    /// Publish the entry count. Reads every shard, so it must run with no
    /// shard guard held.
    fn record_size(&self) {
        metrics::record_cache_size(self.inner.entries.len());
    }
}

impl std::fmt::Debug for CreditCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditCache")
            .field("capacity", &self.inner.capacity)
            .field("batch_size", &self.inner.batch_size)
            .field("entry_count", &self.inner.entries.len())
            .field("tracked", &self.inner.recency.len())
            .finish()
    }
}
