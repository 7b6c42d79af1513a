//! One-file-per-key JSON store on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::KeyValueStore;
use crate::error::{Result, SalatError};

/// Store rooted at a directory. Each key maps to `<sanitised key>.json`.
///
/// Writes go to a temp file that is then renamed over the target, so a
/// reader sees either the old value or the new one.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    /// Store under [`crate::salat_dirs::store_dir`].
    pub fn open_default() -> Self {
        Self::new(crate::salat_dirs::store_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SalatError::Store(format!("cannot read {key}: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SalatError::Store(format!("cannot create store dir: {e}")))?;

        let target = self.path_for(key);
        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(
            ".{}.{}-{seq}.tmp",
            sanitize_key(key),
            std::process::id()
        ));

        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| SalatError::Store(format!("cannot write {key}: {e}")))?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(SalatError::Store(format!("cannot replace {key}: {e}")));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SalatError::Store(format!("cannot remove {key}: {e}"))),
        }
    }
}
