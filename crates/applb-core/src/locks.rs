// ── Per-(network, source IP) exclusion ──
//
// Serializes the count -> reserve -> persist -> stage sequence of create
// and the remove -> release sequence of delete for one source IP. Work on
// different IPs never contends.

use std::net::Ipv4Addr;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RawMutex, lock_api::ArcMutexGuard};

use crate::model::NetworkId;

type Key = (NetworkId, Ipv4Addr);

#[derive(Default)]
pub(crate) struct SourceIpLocks {
    slots: DashMap<Key, Arc<Mutex<()>>>,
}

impl SourceIpLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Block until the slot for `(network, ip)` is free and take it.
    pub(crate) fn lock(&self, network: NetworkId, ip: Ipv4Addr) -> SourceIpGuard<'_> {
        let key = (network, ip);
        // Clone out of the map before blocking so the shard lock is not held.
        let slot = Arc::clone(self.slots.entry(key).or_default().value());
        let guard = slot.lock_arc();

        SourceIpGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Held for the duration of a critical section. Dropping it frees the
/// slot, and forgets it once nobody else is waiting.
pub(crate) struct SourceIpGuard<'a> {
    locks: &'a SourceIpLocks,
    key: Key,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl Drop for SourceIpGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map holds the slot: no waiters left.
        self.locks
            .slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}
