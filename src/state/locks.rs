use std::{future::Future, hash::Hash, sync::Arc};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Table of per-key async mutexes, created lazily on first use.
///
/// Holding the guard returned by [`LockTable::acquire`] grants exclusive access to everything
/// keyed by `K`; dropping it (including during unwinding) releases the key.
pub struct LockTable<K>
where
    K: Eq + Hash + Clone,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> Default for LockTable<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> LockTable<K>
where
    K: Eq + Hash + Clone,
{
    /// Empty table.
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &K) -> OwnedMutexGuard<()> {
        // Clone the handle out of the shard before awaiting so the map is never locked across
        // the wait.
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Run `work` while holding the lock for `key`.
    pub async fn with_lock<F, Fut, T>(&self, key: &K, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire(key).await;
        work().await
    }

    /// Drop the guard for `key` unless somebody holds it or waits for it.
    ///
    /// Returns `true` when the entry was removed.
    pub fn evict(&self, key: &K) -> bool {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
    }

    /// Number of guards currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no guard is tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn sequential_access_reuses_guard() {
        let table = LockTable::<String>::new();
        drop(table.acquire(&"s1".to_string()).await);
        drop(table.acquire(&"s1".to_string()).await);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let table = LockTable::<String>::new();
        let first = table.acquire(&"s1".to_string()).await;
        let second = table.acquire(&"s2".to_string()).await;
        assert_eq!(table.len(), 2);
        drop(first);
        drop(second);
    }

    #[tokio::test]
    async fn same_key_waits_for_release() {
        let table = Arc::new(LockTable::<String>::new());
        let guard = table.acquire(&"s1".to_string()).await;

        let waiter = {
            let table = table.clone();
            tokio::spawn(async move {
                table
                    .with_lock(&"s1".to_string(), || async { 42 })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        assert_eq!(waiter.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn evict_skips_held_guards() {
        let table = LockTable::<String>::new();
        let key = "s1".to_string();
        let guard = table.acquire(&key).await;
        assert!(!table.evict(&key));
        drop(guard);
        assert!(table.evict(&key));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn guard_is_released_when_work_panics() {
        let table = Arc::new(LockTable::<String>::new());
        let key = "s1".to_string();

        let panicking = {
            let table = table.clone();
            let key = key.clone();
            tokio::spawn(async move {
                table
                    .with_lock(&key, || async { panic!("handler fault") })
                    .await
            })
        };
        assert!(panicking.await.is_err());

        let reacquired = tokio::time::timeout(Duration::from_secs(1), table.acquire(&key)).await;
        assert!(reacquired.is_ok());
    }
}
