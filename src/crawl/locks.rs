//! Per-key async locks, created on first use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

/// Registry of one async mutex per key.
///
/// The registry's own lock is held only while looking up or inserting an
/// entry, never while the returned lock is held.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `key`. Every caller with the same key gets the same lock.
    pub fn get(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_string()).or_default().clone()
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_same_lock() {
        let locks = KeyedLocks::new();
        let a = locks.get("20240103");
        let b = locks.get("20240103");
        let c = locks.get("20240110");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let a = locks.get("20240103");
        let _held = a.lock().await;
        let other = locks.get("20240110");
        assert!(other.try_lock().is_ok());
        assert!(locks.get("20240103").try_lock().is_err());
    }
}
