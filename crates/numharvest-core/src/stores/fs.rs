//! Filesystem store: one JSON file per key.
//!
//! The deployment shape this backs: lock and progress records are small
//! JSON files on a filesystem shared by the competing processes.
//! Create-if-absent maps to `O_CREAT | O_EXCL`, which the filesystem makes
//! atomic even across processes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::errors::StoreError;
use crate::ports::RecordStore;

/// Store rooted at a directory. Keys like `lock/numharvest` become
/// `<root>/lock/numharvest.json`.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FsStore {
    async fn create(&self, key: &str, value: Value) -> Result<bool, StoreError> {
        let path = self.path_for(key);
        Self::ensure_parent(&path).await?;
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let bytes = serde_json::to_vec_pretty(&value)?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.path_for(key);
        Self::ensure_parent(&path).await?;
        let bytes = serde_json::to_vec_pretty(&value)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
