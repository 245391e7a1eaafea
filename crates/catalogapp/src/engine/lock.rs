//! Best-effort keyed advisory lock.
//!
//! Suppresses most duplicate attribute materializations, but is not mutual
//! exclusion: a waiter gives up after the configured wait and proceeds
//! unlocked, and a key held longer than the TTL is taken over. The
//! materialization dedup pass covers whatever slips through.

use crate::model::{EntityAttrId, EntryId};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub entry: EntryId,
    pub schema: EntityAttrId,
}

impl LockKey {
    pub fn attribute(entry: EntryId, schema: EntityAttrId) -> Self {
        Self { entry, schema }
    }
}

#[derive(Debug)]
pub struct KeyedLock {
    held: DashMap<LockKey, Instant>,
    wait: Duration,
    ttl: Duration,
}

/// Releases the key on drop, unless it was taken over after expiring.
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a KeyedLock,
    key: LockKey,
    acquired_at: Instant,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let acquired_at = self.acquired_at;
        self.lock
            .held
            .remove_if(&self.key, |_, held_since| *held_since == acquired_at);
    }
}

impl KeyedLock {
    pub fn new(wait: Duration, ttl: Duration) -> Self {
        Self {
            held: DashMap::new(),
            wait,
            ttl,
        }
    }

    /// Take the key if it is free or stale.
    pub fn try_acquire(&self, key: LockKey) -> Option<LockGuard<'_>> {
        let now = Instant::now();
        match self.held.entry(key) {
            MapEntry::Vacant(slot) => {
                slot.insert(now);
            }
            MapEntry::Occupied(mut slot) => {
                if now.duration_since(*slot.get()) < self.ttl {
                    return None;
                }
                slot.insert(now);
            }
        }
        Some(LockGuard {
            lock: self,
            key,
            acquired_at: now,
        })
    }

    /// Wait up to the configured bound for the key. `None` means the wait
    /// timed out and the caller proceeds without the lock.
    pub fn acquire(&self, key: LockKey) -> Option<LockGuard<'_>> {
        let started = Instant::now();
        loop {
            if let Some(guard) = self.try_acquire(key) {
                return Some(guard);
            }
            if started.elapsed() >= self.wait {
                warn!(
                    entry = %key.entry,
                    schema = %key.schema,
                    "materialization lock wait timed out, proceeding unlocked"
                );
                return None;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn is_held(&self, key: LockKey) -> bool {
        self.held
            .get(&key)
            .is_some_and(|since| since.elapsed() < self.ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> LockKey {
        LockKey::attribute(EntryId(1), EntityAttrId(2))
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let lock = KeyedLock::new(Duration::from_millis(10), Duration::from_secs(5));
        let guard = lock.try_acquire(key());
        assert!(guard.is_some());
        assert!(lock.try_acquire(key()).is_none());
        assert!(lock.is_held(key()));
        drop(guard);
        assert!(!lock.is_held(key()));
        assert!(lock.try_acquire(key()).is_some());
    }

    #[test]
    fn keys_are_independent() {
        let lock = KeyedLock::new(Duration::from_millis(10), Duration::from_secs(5));
        let _a = lock.try_acquire(key()).unwrap();
        assert!(lock
            .try_acquire(LockKey::attribute(EntryId(1), EntityAttrId(3)))
            .is_some());
    }

    #[test]
    fn bounded_wait_gives_up() {
        let lock = KeyedLock::new(Duration::from_millis(20), Duration::from_secs(5));
        let _held = lock.try_acquire(key()).unwrap();
        let started = Instant::now();
        assert!(lock.acquire(key()).is_none());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn stale_key_is_taken_over() {
        let lock = KeyedLock::new(Duration::from_millis(10), Duration::from_millis(5));
        let stale = lock.try_acquire(key()).unwrap();
        thread::sleep(Duration::from_millis(10));
        let fresh = lock.try_acquire(key());
        assert!(fresh.is_some());
        drop(stale);
        assert!(lock.held.contains_key(&key()));
    }
}
