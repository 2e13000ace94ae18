//! Directory of stage outputs used for idempotent re-entry

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub async fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Existence is the only completion check; content is not verified.
    pub async fn exists(&self, name: &str) -> bool {
        fs::try_exists(self.path(name)).await.unwrap_or(false)
    }

    pub async fn read_text(&self, name: &str) -> Result<String> {
        Ok(fs::read_to_string(self.path(name)).await?)
    }

    pub async fn write_text(&self, name: &str, text: &str) -> Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, text).await?;
        Ok(path)
    }

    pub async fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let content = fs::read_to_string(self.path(name)).await?;
        serde_json::from_str(&content).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }

    pub async fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.write_text(name, &json).await
    }

    /// Copy a file produced elsewhere into the store under `name`. The
    /// copy lands under a temporary name first, so `name` never exists
    /// half-written.
    pub async fn import(&self, name: &str, source: &Path) -> Result<PathBuf> {
        let path = self.path(name);
        if source != path {
            let partial = self.path(&format!(".{}.partial", name));
            fs::copy(source, &partial).await?;
            fs::rename(&partial, &path).await?;
        }
        Ok(path)
    }
}
