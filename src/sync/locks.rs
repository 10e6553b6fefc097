// src/sync/locks.rs
//! Keyed exclusion and cooperative cancellation.

use crate::types::NoteId;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key, created on first use.
#[derive(Debug)]
pub struct KeyedLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &K) -> OwnedMutexGuard<()> {
        // The map shard must not stay locked across the await.
        let lock = Arc::clone(self.locks.entry(key.clone()).or_default().value());
        lock.lock_owned().await
    }
}

/// At most one in-flight pipeline per note id.
pub type NoteLocks = KeyedLocks<NoteId>;

/// At most one page creation per remote title, so the existence check sees
/// every page another note created under the same title.
pub type TitleLocks = KeyedLocks<String>;

/// Shared flag checked before each note starts. In-flight notes finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_note_is_serialized() {
        let locks = Arc::new(NoteLocks::new());
        let id = NoteId::new("a.md").unwrap();

        let guard = locks.acquire(&id).await;
        let contender = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_notes_do_not_block() {
        let locks = NoteLocks::new();
        let _a = locks.acquire(&NoteId::new("a.md").unwrap()).await;
        let _b = locks.acquire(&NoteId::new("b.md").unwrap()).await;
    }

    #[tokio::test]
    async fn titles_are_locked_by_value() {
        let locks = TitleLocks::new();
        let guard = locks.acquire(&"todo".to_string()).await;
        assert!(locks.locks.get("todo").unwrap().try_lock().is_err());
        drop(guard);
        let _other = locks.acquire(&"ideas".to_string()).await;
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }
}
