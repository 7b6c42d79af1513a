//! Durable key/value persistence.
//!
//! Values are strings, usually JSON. Every write replaces the whole value;
//! there is no partial update, so concurrent writers race last-writer-wins
//! without leaving a half-written entry behind.

pub mod file;
pub mod keys;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, SalatError};

/// String key/value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Typed helpers on top of [`KeyValueStore`].
#[async_trait]
pub trait StoreExt {
    /// Decode a JSON value.
    ///
    /// # Errors
    ///
    /// [`SalatError::CacheCorruption`] when the stored value is not valid
    /// JSON for `T`. The entry is left in place; callers decide whether to
    /// delete it.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    async fn set_json<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) -> Result<()>;

    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    async fn get_int(&self, key: &str) -> Result<Option<i64>>;

    async fn set_int(&self, key: &str, value: i64) -> Result<()>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> StoreExt for S {
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| SalatError::CacheCorruption(format!("{key}: {e}")))
    }

    async fn set_json<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| SalatError::Store(format!("cannot serialize {key}: {e}")))?;
        self.set(key, raw).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get_json(key).await
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_json(key, &value).await
    }

    async fn get_int(&self, key: &str) -> Result<Option<i64>> {
        self.get_json(key).await
    }

    async fn set_int(&self, key: &str, value: i64) -> Result<()> {
        self.set_json(key, &value).await
    }
}
