//! Per-job working directory

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Scratch directory exclusively owned by one job.
///
/// [`Workspace::close`] removes it; if the workspace is dropped without
/// being closed (a panic inside the run) the directory is still removed.
#[derive(Debug)]
pub struct Workspace {
    job_id: String,
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh directory under `parent`, named after the job
    pub fn create(parent: &Path, job_id: &str) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", job_id))
            .tempdir_in(parent)?;
        let path = dir.path().to_path_buf();
        debug!("📁 Workspace for job {}: {}", job_id, path.display());

        Ok(Self {
            job_id: job_id.to_string(),
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Remove the directory and everything in it
    pub fn close(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                dir.close()?;
                debug!("🧹 Removed workspace for job {}", self.job_id);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.dir.is_some() {
            warn!(
                "Workspace for job {} dropped without close, removing {}",
                self.job_id,
                self.path.display()
            );
        }
    }
}
