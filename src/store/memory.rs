//! In-process store for tests and dry runs.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::KeyValueStore;
use crate::error::{Result, SalatError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted list of keys currently present.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SalatError::Store("memory store lock poisoned".into()))?;
        Ok(f(&mut entries))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_owned(), value);
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }
}
