//! Keyed async mutexes
//!
//! One mutex per key, created on demand and dropped once nobody holds or
//! waits on it.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of per-key mutexes
#[derive(Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        self.entry(key).await.lock_owned().await
    }

    /// Exclusive access to `key` if nobody else holds it
    pub async fn try_lock(&self, key: &str) -> Option<OwnedMutexGuard<()>> {
        self.entry(key).await.try_lock_owned().ok()
    }

    /// Number of keys currently tracked
    pub async fn tracked_keys(&self) -> usize {
        self.inner.lock().await.len()
    }

    async fn entry(&self, key: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().await;
        // Unreferenced entries are neither held nor awaited
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        map.entry(key.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_try_lock_is_exclusive_per_key() {
        let locks = KeyedLocks::new();
        let guard = locks.try_lock("ABC123").await;
        assert!(guard.is_some());
        assert!(locks.try_lock("ABC123").await.is_none());
        assert!(locks.try_lock("XYZ789").await.is_some());

        drop(guard);
        assert!(locks.try_lock("ABC123").await.is_some());
    }

    #[tokio::test]
    async fn test_released_keys_are_pruned() {
        let locks = KeyedLocks::new();
        for code in ["A", "B", "C"] {
            let _guard = locks.lock(code).await;
        }
        let _held = locks.lock("D").await;
        assert_eq!(locks.tracked_keys().await, 1);
    }
}
