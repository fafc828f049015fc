use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Per-identity mutual exclusion.
///
/// Operations on different identities never wait on each other; operations on
/// the same identity run one at a time. Entries are dropped once no caller holds
/// or waits for them.
#[derive(Debug, Default)]
pub struct IdentityLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity<T>(&self, identity: &str, f: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(
                slots
                    .entry(identity.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        let _release = SlotRelease {
            locks: self,
            identity,
            slot: &slot,
        };

        let _guard = slot.lock();
        f()
    }

    /// Number of identities currently tracked.
    pub fn active(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Drops the map entry once the last user of a slot leaves, including when
/// the closure panics.
struct SlotRelease<'a> {
    locks: &'a IdentityLocks,
    identity: &'a str,
    slot: &'a Arc<Mutex<()>>,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots.lock();
        // One reference in the map, one held by the caller: nobody else is queued.
        if Arc::strong_count(self.slot) == 2 {
            slots.remove(self.identity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_identity_is_serialized() {
        let locks = IdentityLocks::new();
        let inside = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    locks.with_identity("bob", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[test]
    fn panicking_closure_releases_identity() {
        let locks = IdentityLocks::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            locks.with_identity("carol", || panic!("boom"))
        }));

        assert!(result.is_err());
        assert_eq!(locks.active(), 0);
        assert_eq!(locks.with_identity("carol", || 3), 3);
    }

    #[test]
    fn different_identities_do_not_block() {
        let locks = IdentityLocks::new();
        let value = locks.with_identity("alice", || locks.with_identity("bob", || 7));
        assert_eq!(value, 7);
        assert_eq!(locks.active(), 0);
    }
}
