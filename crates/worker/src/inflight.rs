//! Per-fingerprint single-flight registry
//!
//! At most one job per fingerprint runs the tool at a time. Later arrivals
//! queue on the same lock and re-check the cache once they get it, so
//! concurrent identical requests cost one tool run. Entries are removed by
//! the last slot to let go of them.

use apkforge_core::Fingerprint;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type Entries = DashMap<Fingerprint, Arc<Mutex<()>>>;

#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: Arc<Entries>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other slot for `fingerprint` is held, then hold it.
    ///
    /// Cancel-safe: dropping the future while waiting releases the
    /// registration.
    pub async fn acquire(&self, fingerprint: Fingerprint) -> InFlightSlot {
        let cell = self.entries.entry(fingerprint).or_default().clone();
        let mut slot = InFlightSlot {
            fingerprint,
            entries: Arc::clone(&self.entries),
            cell: Some(Arc::clone(&cell)),
            guard: None,
        };

        let guard = match Arc::clone(&cell).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(
                    fingerprint = %fingerprint.short(),
                    "identical job in flight, waiting"
                );
                cell.lock_owned().await
            }
        };
        slot.guard = Some(guard);
        slot
    }

    /// Number of fingerprints with a holder or waiter
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exclusive hold on one fingerprint, released on drop
#[derive(Debug)]
pub struct InFlightSlot {
    fingerprint: Fingerprint,
    entries: Arc<Entries>,
    cell: Option<Arc<Mutex<()>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl InFlightSlot {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        drop(self.guard.take());
        drop(self.cell.take());
        // Only the map's own reference left: nobody holds or waits on it.
        // `remove_if` runs under the shard lock, the same lock `acquire`
        // clones under, so a new arrival cannot slip in between.
        self.entries
            .remove_if(&self.fingerprint, |_, cell| Arc::strong_count(cell) == 1);
    }
}
