//! Per-key lock table.
//!
//! Serializes mutating operations on the same `(bucket, key)` while leaving
//! distinct keys fully parallel. Entries are allocated on demand and
//! reference-counted so the table cannot grow without bound under key churn:
//! the slot disappears as soon as its last holder or waiter is gone.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockKey = (String, String);

#[derive(Debug)]
struct LockSlot {
    mutex: Arc<Mutex<()>>,
    /// Holders plus waiters currently interested in this slot.
    refs: AtomicUsize,
}

/// Map from `(bucket, key)` to an exclusive, refcounted mutex.
#[derive(Debug, Default)]
pub(crate) struct KeyLockTable {
    slots: DashMap<LockKey, Arc<LockSlot>>,
}

impl KeyLockTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive lock for `(bucket, key)`.
    ///
    /// The lock is held until the returned guard drops.
    pub(crate) async fn acquire(&self, bucket: &str, key: &str) -> KeyGuard<'_> {
        let lock_key = (bucket.to_owned(), key.to_owned());

        // Register interest while the map entry is held so a concurrent
        // release cannot reclaim the slot between lookup and increment.
        let slot = {
            let entry = self.slots.entry(lock_key.clone()).or_insert_with(|| {
                Arc::new(LockSlot {
                    mutex: Arc::new(Mutex::new(())),
                    refs: AtomicUsize::new(0),
                })
            });
            let slot = Arc::clone(entry.value());
            slot.refs.fetch_add(1, Ordering::SeqCst);
            slot
        };

        let guard = Arc::clone(&slot.mutex).lock_owned().await;
        KeyGuard {
            table: self,
            lock_key,
            slot,
            guard: Some(guard),
        }
    }

    /// Number of live slots. Zero once every guard has dropped.
    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn release(&self, lock_key: &LockKey, slot: &Arc<LockSlot>) {
        if slot.refs.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Reclaim only if nobody re-registered in the meantime.
            self.slots
                .remove_if(lock_key, |_, s| s.refs.load(Ordering::SeqCst) == 0);
        }
    }
}

/// RAII guard for one `(bucket, key)` lock.
pub(crate) struct KeyGuard<'a> {
    table: &'a KeyLockTable,
    lock_key: LockKey,
    slot: Arc<LockSlot>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex before dropping the refcount so a waiter that
        // wakes up still finds the slot registered.
        self.guard.take();
        self.table.release(&self.lock_key, &self.slot);
    }
}
