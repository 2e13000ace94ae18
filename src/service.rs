//! Submission boundary: accepts jobs and answers status queries

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::SubmitError;
use crate::pipeline::{JobSpec, Orchestrator, PipelineSettings, RunOptions, Workspace};
use crate::services::{LLMProvider, Services};
use crate::state::{collect_stats, JobRecord, JobStore, JobStoreStats, StoreError};

/// Handle returned to the client for a newly accepted job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub job_id: String,
    pub status_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LanguageModelStatus {
    pub provider: LLMProvider,
    pub available: bool,
}

pub fn status_url(job_id: &str) -> String {
    format!("/localize/status/{}", job_id)
}

/// Final path component of a client-supplied file name
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let name = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or("")
        .trim();
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

/// Job id derived from a file name, safe for paths and storage keys
pub fn job_id_from_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let id: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        id
    }
}

pub struct LocalizationService {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn JobStore>,
    work_dir: PathBuf,
    job_slots: Arc<Semaphore>,
    max_upload_bytes: usize,
}

impl LocalizationService {
    pub fn new(
        services: Services,
        store: Arc<dyn JobStore>,
        settings: PipelineSettings,
        work_dir: PathBuf,
        max_concurrent_jobs: usize,
    ) -> Self {
        info!("🔧 Localization service ready with {} job slots", max_concurrent_jobs);
        Self {
            orchestrator: Arc::new(Orchestrator::new(services, Arc::clone(&store), settings)),
            store,
            work_dir,
            job_slots: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            max_upload_bytes: usize::MAX,
        }
    }

    pub fn from_config(config: &Config, services: Services, store: Arc<dyn JobStore>) -> Self {
        let mut service = Self::new(
            services,
            store,
            PipelineSettings::from_config(config),
            config.service.work_dir.clone(),
            config.service.max_concurrent_jobs,
        );
        service.max_upload_bytes = config.service.max_upload_bytes;
        service
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Accept a job and schedule it in the background.
    ///
    /// The job is visible as `starting` before this returns; the run itself
    /// waits for a free job slot.
    pub async fn submit(&self, media: &[u8], filename: &str, target_lang: &str) -> Result<Submission, SubmitError> {
        if media.is_empty() {
            return Err(SubmitError::InvalidRequest("media file is empty".to_string()));
        }
        if media.len() > self.max_upload_bytes {
            return Err(SubmitError::InvalidRequest(format!(
                "media file exceeds {} bytes",
                self.max_upload_bytes
            )));
        }
        let target_lang = target_lang.trim();
        if target_lang.is_empty() {
            return Err(SubmitError::InvalidRequest("target_lang is required".to_string()));
        }
        let source_name = sanitize_filename(filename)
            .ok_or_else(|| SubmitError::InvalidRequest(format!("invalid file name: {:?}", filename)))?;

        let job_id = Uuid::new_v4().to_string();
        let workspace = Workspace::create(&self.work_dir, &job_id)?;
        let source_path = workspace.path().join(&source_name);
        tokio::fs::write(&source_path, media).await?;

        self.store.create(JobRecord::new(&job_id, target_lang)).await?;

        let spec = JobSpec {
            job_id: job_id.clone(),
            target_lang: target_lang.to_string(),
            source_path,
            source_name,
        };
        info!("📥 Job {} accepted ({} bytes, target {})", job_id, media.len(), target_lang);

        let orchestrator = Arc::clone(&self.orchestrator);
        let job_slots = Arc::clone(&self.job_slots);
        tokio::spawn(async move {
            let _permit = match job_slots.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Job {}: no job slot available: {}", spec.job_id, e);
                    return;
                }
            };
            let job_id = spec.job_id.clone();
            if let Err(e) = orchestrator.run(spec, workspace, RunOptions::default()).await {
                error!("Job {}: failed to record outcome: {}", job_id, e);
            }
        });

        Ok(Submission {
            status_url: status_url(&job_id),
            job_id,
        })
    }

    /// Current record for `job_id`, `None` if the id was never issued
    pub async fn get_status(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        self.store.get(job_id).await
    }

    pub async fn stats(&self) -> Result<JobStoreStats, StoreError> {
        collect_stats(self.store.as_ref()).await
    }

    /// Configured language model provider and whether it answers
    pub async fn language_model_status(&self) -> LanguageModelStatus {
        let model = &self.orchestrator.services().language_model;
        LanguageModelStatus {
            provider: model.provider_type(),
            available: model.is_available().await,
        }
    }

    /// Run one job in the foreground on a local file and return its final
    /// record. Without an explicit id the job id is derived from the file
    /// name, so re-running the same file resumes from its artifacts.
    pub async fn localize_file(
        &self,
        path: &Path,
        target_lang: &str,
        job_id: Option<String>,
        options: RunOptions,
    ) -> Result<JobRecord, SubmitError> {
        let target_lang = target_lang.trim();
        if target_lang.is_empty() {
            return Err(SubmitError::InvalidRequest("target_lang is required".to_string()));
        }
        if !tokio::fs::try_exists(path).await? {
            return Err(SubmitError::InvalidRequest(format!(
                "video file not found: {}",
                path.display()
            )));
        }
        let source_name = sanitize_filename(&path.to_string_lossy())
            .ok_or_else(|| SubmitError::InvalidRequest(format!("invalid file name: {}", path.display())))?;
        let job_id = job_id.unwrap_or_else(|| job_id_from_name(&source_name));

        let workspace = Workspace::create(&self.work_dir, &job_id)?;
        // Re-running a finished job starts a fresh record under the same id
        self.store.create_or_reset(JobRecord::new(&job_id, target_lang)).await?;

        let spec = JobSpec {
            job_id,
            target_lang: target_lang.to_string(),
            source_path: path.to_path_buf(),
            source_name,
        };

        let _permit = Arc::clone(&self.job_slots)
            .acquire_owned()
            .await
            .map_err(|e| SubmitError::InvalidRequest(e.to_string()))?;

        Ok(self.orchestrator.run(spec, workspace, options).await?)
    }
}
