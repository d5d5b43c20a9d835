//! Per-key critical sections
//!
//! Store fallbacks and writes for one key run one at a time; different keys
//! never contend beyond the brief table lookup. Slots are dropped from the
//! table once nobody holds or waits on them.

use std::collections::HashMap;
use std::sync::Arc;
use ahash::RandomState;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

type Slot = Arc<Mutex<()>>;

/// Table of lazily created per-key mutexes
#[derive(Default)]
pub(crate) struct KeyLocks {
    slots: Mutex<HashMap<String, Slot, RandomState>>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Block until the caller holds `key`
    pub(crate) fn lock(&self, key: &str) -> KeyGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.to_string()).or_default())
        };
        let guard = slot.lock_arc();
        KeyGuard {
            locks: self,
            key: key.to_string(),
            slot,
            guard: Some(guard),
        }
    }

    /// Keys with a live slot
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Held critical section for one key
pub(crate) struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
    slot: Slot,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.locks.slots.lock();
        // the table and this guard hold the only references: nobody waits
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_slot_released() {
        let locks = KeyLocks::new();
        {
            let _a = locks.lock("k1");
            let _b = locks.lock("k2");
            assert_eq!(locks.len(), 2);
        }
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn test_same_key_is_exclusive() {
        let locks = KeyLocks::new();
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let _guard = locks.lock("hot");
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(2));
                    inside.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn test_distinct_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.lock("k1");
        // would deadlock if k2 shared k1's slot
        let _b = locks.lock("k2");
    }
}
