//! Local key-value persistence.
//!
//! The [`LocalStore`] trait is a minimal string key-value interface, the
//! device-local cache the tracking session survives restarts in. Values are
//! opaque strings; typed encoding lives with the callers.
//!
//! # Providers
//!
//! - [`MemoryLocalStore`] - process-local, for tests and simulation
//! - [`FileLocalStore`] - one file per key under a directory

mod file;

pub use file::FileLocalStore;

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

/// Errors from a local store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error from the backing medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key contains characters the backend cannot store.
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// String key-value store.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory local store.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryLocalStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
