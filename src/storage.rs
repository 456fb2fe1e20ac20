use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded for key {key}")]
    QuotaExceeded { key: String },
}

/// Key-value persistence port
///
/// Models a browser-style storage area: string keys, string values. The flag
/// store uses a session-scoped instance, the vault a persistent one.
pub trait KeyValueStorage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn clear(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory implementation of KeyValueStorage
///
/// Used by the driver binary and by tests. Data lives as long as the value
/// does, so sharing one instance through an `Arc` between two stores
/// simulates a page reload within the same browser session.
#[derive(Debug)]
pub struct InMemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Creates a new empty storage area
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a storage area with pre-populated entries
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Returns the number of stored keys
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Checks if a key is present (useful for debugging)
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for InMemoryStorage {
    #[instrument(skip(self))]
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self.lock().get(key).cloned();
        debug!(key = %key, found = value.is_some(), "Read storage key");
        Ok(value)
    }

    #[instrument(skip(self, value))]
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        debug!(key = %key, bytes = value.len(), "Writing storage key");
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    #[instrument(skip(self))]
    fn clear(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.lock().remove(key).is_some();
        debug!(key = %key, removed, "Cleared storage key");
        Ok(())
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;

    /// Storage that fails every operation - for exercising error paths
    pub struct FailingStorage;

    impl KeyValueStorage for FailingStorage {
        fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("read refused".to_string()))
        }
        fn write(&self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::QuotaExceeded {
                key: key.to_string(),
            })
        }
        fn clear(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("clear refused".to_string()))
        }
    }
}
