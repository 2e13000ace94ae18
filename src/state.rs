//! Job state store consulted by status queries
//!
//! The orchestrator is the only writer for a given job id; any number of
//! readers may poll concurrently.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::LocalizationResult;

/// Error recorded for jobs that were running when the process stopped
pub const INTERRUPTED_ERROR: &str = "Job interrupted by restart";

/// Lifecycle status of a localization job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Status record of one job as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub target_lang: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<LocalizationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// State transition applied by the orchestrator
#[derive(Debug, Clone)]
pub enum JobUpdate {
    /// Stage about to run, e.g. "2/7: Transcribing video"
    Step(String),
    Completed(LocalizationResult),
    Failed(String),
}

impl JobRecord {
    pub fn new(job_id: impl Into<String>, target_lang: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            target_lang: target_lang.into(),
            status: JobStatus::Starting,
            step: None,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update. Terminal records are frozen and reject further
    /// changes.
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), StoreError> {
        if self.status.is_terminal() {
            return Err(StoreError::Terminal {
                job_id: self.job_id.clone(),
                status: self.status,
            });
        }

        match update {
            JobUpdate::Step(step) => {
                self.status = JobStatus::InProgress;
                self.step = Some(step);
            }
            JobUpdate::Completed(result) => {
                self.status = JobStatus::Completed;
                self.step = None;
                self.result = Some(result);
            }
            JobUpdate::Failed(error) => {
                self.status = JobStatus::Failed;
                self.step = None;
                self.error = Some(error);
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Error types for job store operations
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} is already {status:?}")]
    Terminal { job_id: String, status: JobStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keyed store of job records
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, record: JobRecord) -> Result<(), StoreError>;
    /// Insert `record`, replacing a finished record with the same id.
    /// A record that is still running is left alone and reported as
    /// `AlreadyExists`.
    async fn create_or_reset(&self, record: JobRecord) -> Result<(), StoreError>;
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError>;
    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<JobRecord, StoreError>;
    async fn list(&self) -> Result<Vec<JobRecord>, StoreError>;
}

fn check_replaceable(existing: Option<&JobRecord>) -> Result<(), StoreError> {
    match existing {
        Some(record) if !record.status.is_terminal() => Err(StoreError::AlreadyExists(record.job_id.clone())),
        _ => Ok(()),
    }
}

/// Counts of jobs per status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStoreStats {
    pub total_jobs: usize,
    pub starting: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

pub async fn collect_stats(store: &dyn JobStore) -> Result<JobStoreStats, StoreError> {
    let mut stats = JobStoreStats::default();
    for record in store.list().await? {
        stats.total_jobs += 1;
        match record.status {
            JobStatus::Starting => stats.starting += 1,
            JobStatus::InProgress => stats.in_progress += 1,
            JobStatus::Completed => stats.completed += 1,
            JobStatus::Failed => stats.failed += 1,
        }
    }
    Ok(stats)
}

/// Process-lifetime store backed by a hash map
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<String, JobRecord>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, record: JobRecord) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.job_id) {
            return Err(StoreError::AlreadyExists(record.job_id));
        }
        jobs.insert(record.job_id.clone(), record);
        Ok(())
    }

    async fn create_or_reset(&self, record: JobRecord) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        check_replaceable(jobs.get(&record.job_id))?;
        jobs.insert(record.job_id.clone(), record);
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<JobRecord, StoreError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        record.apply(update)?;
        Ok(record.clone())
    }

    async fn list(&self) -> Result<Vec<JobRecord>, StoreError> {
        Ok(self.jobs.read().await.values().cloned().collect())
    }
}

/// Durable store writing one JSON file per job, with an in-memory cache
/// rebuilt from disk on start.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    state_dir: PathBuf,
    cache: Arc<RwLock<HashMap<String, JobRecord>>>,
}

impl FileJobStore {
    pub async fn new(state_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&state_dir).await?;

        let store = Self {
            state_dir,
            cache: Arc::new(RwLock::new(HashMap::new())),
        };
        let loaded = store.load_existing_records().await?;

        info!("📊 Job store initialized with {} persisted jobs", loaded);
        Ok(store)
    }

    async fn load_existing_records(&self) -> Result<usize, StoreError> {
        let mut entries = fs::read_dir(&self.state_dir).await?;
        let mut loaded = 0;
        let mut interrupted = 0;
        let mut cache = self.cache.write().await;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                match Self::load_record_file(&path).await {
                    Ok(mut record) => {
                        if !record.status.is_terminal() {
                            warn!(
                                "Job {} was {:?} when the process stopped, marking failed",
                                record.job_id, record.status
                            );
                            record.apply(JobUpdate::Failed(INTERRUPTED_ERROR.to_string()))?;
                            self.save_to_disk(&record).await?;
                            interrupted += 1;
                        }
                        cache.insert(record.job_id.clone(), record);
                        loaded += 1;
                    }
                    Err(e) => warn!("Failed to load job file {}: {}", path.display(), e),
                }
            }
        }

        if interrupted > 0 {
            info!("🧹 Marked {} interrupted jobs as failed", interrupted);
        }
        Ok(loaded)
    }

    async fn load_record_file(path: &Path) -> Result<JobRecord, StoreError> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    fn record_path(&self, job_id: &str) -> PathBuf {
        let file_name: String = job_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.state_dir.join(format!("{}.json", file_name))
    }

    async fn save_to_disk(&self, record: &JobRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.job_id);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(record)?).await?;
        fs::rename(&tmp_path, &path).await?;
        debug!("💾 Saved job {} to {}", record.job_id, path.display());
        Ok(())
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn create(&self, record: JobRecord) -> Result<(), StoreError> {
        let mut cache = self.cache.write().await;
        if cache.contains_key(&record.job_id) {
            return Err(StoreError::AlreadyExists(record.job_id));
        }
        self.save_to_disk(&record).await?;
        cache.insert(record.job_id.clone(), record);
        Ok(())
    }

    async fn create_or_reset(&self, record: JobRecord) -> Result<(), StoreError> {
        let mut cache = self.cache.write().await;
        check_replaceable(cache.get(&record.job_id))?;
        if cache.contains_key(&record.job_id) {
            info!("🔄 Restarting job {}", record.job_id);
        }
        self.save_to_disk(&record).await?;
        cache.insert(record.job_id.clone(), record);
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.cache.read().await.get(job_id).cloned())
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<JobRecord, StoreError> {
        let mut cache = self.cache.write().await;
        let mut record = cache
            .get(job_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        record.apply(update)?;
        self.save_to_disk(&record).await?;
        cache.insert(job_id.to_string(), record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<JobRecord>, StoreError> {
        Ok(self.cache.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualityReport;
    use tempfile::TempDir;

    fn sample_result() -> LocalizationResult {
        LocalizationResult {
            video_locator: "s3://bucket/localized/job_localized.mp4".to_string(),
            transcript: "Hello world".to_string(),
            translation: "Hola mundo".to_string(),
            quality_report: QualityReport::default(),
            detected_language: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryJobStore::new();
        store.create(JobRecord::new("job-1", "es")).await.unwrap();

        let record = store.get("job-1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Starting);
        assert_eq!(record.target_lang, "es");
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = InMemoryJobStore::new();
        store.create(JobRecord::new("job-1", "es")).await.unwrap();
        let err = store.create(JobRecord::new("job-1", "fr")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_step_then_complete() {
        let store = InMemoryJobStore::new();
        store.create(JobRecord::new("job-1", "es")).await.unwrap();

        let record = store
            .update("job-1", JobUpdate::Step("1/7: Uploading video".to_string()))
            .await
            .unwrap();
        assert_eq!(record.status, JobStatus::InProgress);
        assert_eq!(record.step.as_deref(), Some("1/7: Uploading video"));

        let record = store
            .update("job-1", JobUpdate::Completed(sample_result()))
            .await
            .unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert!(record.step.is_none());
        assert_eq!(record.result.unwrap().translation, "Hola mundo");
    }

    #[tokio::test]
    async fn test_terminal_record_is_frozen() {
        let store = InMemoryJobStore::new();
        store.create(JobRecord::new("job-1", "es")).await.unwrap();
        store
            .update("job-1", JobUpdate::Failed("boom".to_string()))
            .await
            .unwrap();

        let err = store
            .update("job-1", JobUpdate::Step("2/7: Transcribing video".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Terminal { .. }));

        let record = store.get("job-1").await.unwrap().unwrap();
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_status_json_shape() {
        let mut record = JobRecord::new("job-1", "es");
        record
            .apply(JobUpdate::Step("3/7: Translating text".to_string()))
            .unwrap();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["step"], "3/7: Translating text");
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_file_store_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let state_dir = temp_dir.path().join("jobs");

        {
            let store = FileJobStore::new(state_dir.clone()).await.unwrap();
            store.create(JobRecord::new("job-1", "zh-HK")).await.unwrap();
            store
                .update("job-1", JobUpdate::Completed(sample_result()))
                .await
                .unwrap();
        }

        let reloaded = FileJobStore::new(state_dir).await.unwrap();
        let record = reloaded.get("job-1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.result, Some(sample_result()));
    }

    #[tokio::test]
    async fn test_reload_fails_interrupted_jobs() {
        let temp_dir = TempDir::new().unwrap();
        let state_dir = temp_dir.path().join("jobs");

        {
            let store = FileJobStore::new(state_dir.clone()).await.unwrap();
            store.create(JobRecord::new("running", "es")).await.unwrap();
            store
                .update("running", JobUpdate::Step("4/7: Analyzing translation quality".to_string()))
                .await
                .unwrap();
            store.create(JobRecord::new("queued", "es")).await.unwrap();
            store.create(JobRecord::new("done", "es")).await.unwrap();
            store
                .update("done", JobUpdate::Completed(sample_result()))
                .await
                .unwrap();
        }

        let reloaded = FileJobStore::new(state_dir.clone()).await.unwrap();
        for id in ["running", "queued"] {
            let record = reloaded.get(id).await.unwrap().unwrap();
            assert_eq!(record.status, JobStatus::Failed);
            assert_eq!(record.error.as_deref(), Some(INTERRUPTED_ERROR));
            assert!(record.step.is_none());
        }
        assert_eq!(
            reloaded.get("done").await.unwrap().unwrap().status,
            JobStatus::Completed
        );

        // The failure was persisted, not just applied in memory
        let again = FileJobStore::new(state_dir).await.unwrap();
        assert_eq!(
            again.get("running").await.unwrap().unwrap().status,
            JobStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_create_or_reset_replaces_finished_record() {
        let store = InMemoryJobStore::new();
        store.create(JobRecord::new("job-1", "es")).await.unwrap();

        // Still running: not replaced
        let err = store
            .create_or_reset(JobRecord::new("job-1", "fr"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        store
            .update("job-1", JobUpdate::Failed("boom".to_string()))
            .await
            .unwrap();
        store
            .create_or_reset(JobRecord::new("job-1", "fr"))
            .await
            .unwrap();

        let record = store.get("job-1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Starting);
        assert_eq!(record.target_lang, "fr");
        assert!(record.error.is_none());

        // Unknown ids are simply created
        store.create_or_reset(JobRecord::new("job-2", "es")).await.unwrap();
        assert!(store.get("job-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = InMemoryJobStore::new();
        store.create(JobRecord::new("a", "es")).await.unwrap();
        store.create(JobRecord::new("b", "es")).await.unwrap();
        store
            .update("b", JobUpdate::Failed("boom".to_string()))
            .await
            .unwrap();

        let stats = collect_stats(&store).await.unwrap();
        assert_eq!(stats.total_jobs, 2);
        assert_eq!(stats.starting, 1);
        assert_eq!(stats.failed, 1);
    }
}
