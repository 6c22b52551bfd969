//! Key-value persistence contract.
//!
//! The result cache and the stored proxy settings are clients of this store;
//! neither owns it. Values are opaque JSON strings.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem or other I/O problem in the backend.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend's own data could not be read or written.
    #[error("Store data error: {0}")]
    Data(String),
}

/// Asynchronous string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Every key currently stored, in no particular order.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    async fn remove_many(&self, keys: &[String]) -> Result<(), StoreError>;
}

/// Process-local store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Data("memory store lock poisoned".to_string())
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.keys().cloned().collect())
    }

    async fn remove_many(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}
