//! Object storage adapter
//!
//! Keys are `/`-separated paths inside a single bucket. Locators returned by
//! [`ObjectStorage::put`] take the form `s3://<bucket>/<key>`.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Error types for object storage
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload a local file under `key` and return its locator
    async fn put(&self, local_path: &Path, key: &str) -> Result<String, StorageError>;

    /// Download `key` to `local_path`
    async fn get(&self, key: &str, local_path: &Path) -> Result<(), StorageError>;

    /// Keys starting with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Locator for a key, whether or not it exists
    fn locator(&self, key: &str) -> String;
}

/// Filesystem-backed bucket
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    bucket: String,
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(bucket: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            bucket: bucket.into(),
            root: root.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Resolve a key to a path under the root, refusing anything that would
    /// escape it.
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn not_found_or_io(error: std::io::Error, key: &str) -> StorageError {
    if error.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(error)
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStore {
    async fn put(&self, local_path: &Path, key: &str) -> Result<String, StorageError> {
        let target = self.object_path(key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let bytes = fs::copy(local_path, &target).await?;
        debug!("📤 Stored {} ({} bytes) as {}", local_path.display(), bytes, key);
        Ok(self.locator(key))
    }

    async fn get(&self, key: &str, local_path: &Path) -> Result<(), StorageError> {
        let source = self.object_path(key)?;
        if !fs::try_exists(&source).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&source, local_path)
            .await
            .map_err(|e| not_found_or_io(e, key))?;
        debug!("📥 Fetched {} to {}", key, local_path.display());
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let root = self.root.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || {
            let mut keys = Vec::new();
            for entry in WalkDir::new(&root).min_depth(1) {
                let entry = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(relative) = entry.path().strip_prefix(&root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.starts_with(&prefix) {
                    keys.push(key);
                }
            }
            keys.sort();
            Ok(keys)
        })
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?
    }

    fn locator(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}
