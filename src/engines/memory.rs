use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::KvsEngine;

/// An in-memory key-value store shared by every session.
///
/// The map sits behind a single `RwLock`: any number of `get` calls
/// proceed together, while `set` and `remove` take the lock exclusively.
/// Nothing is persisted; the contents live as long as the last clone.
#[derive(Clone, Default)]
pub struct MemStore {
    map: Arc<RwLock<HashMap<String, String>>>,
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys currently stored.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panicking holder cannot leave the map half-written: every mutation
    // is one `insert` or `remove`, so a poisoned lock is safe to reuse.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.map.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.map.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KvsEngine for MemStore {
    fn set(&self, key: String, value: String) {
        debug_assert!(!key.is_empty(), "keys must be non-empty");
        self.write().insert(key, value);
    }

    fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    fn remove(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }
}
