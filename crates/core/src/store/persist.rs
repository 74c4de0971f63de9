use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable storage port: one JSON blob per fixed key, loaded once at startup
/// and overwritten wholesale on every mutation.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn save(&self, key: &str, blob: &str) -> Result<(), PersistError>;
}

/// In-memory state store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.blobs().get(key).cloned())
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), PersistError> {
        self.blobs().insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryStateStore, StateStore};

    #[test]
    fn memory_store_round_trips_blobs() {
        let store = MemoryStateStore::new();
        assert!(store.load("missing").unwrap().is_none());
        store.save("key", r#"{"a":1}"#).unwrap();
        assert_eq!(store.load("key").unwrap().as_deref(), Some(r#"{"a":1}"#));
        store.save("key", r#"{"a":2}"#).unwrap();
        assert_eq!(store.load("key").unwrap().as_deref(), Some(r#"{"a":2}"#));
    }
}
