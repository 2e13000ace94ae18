use regex::Regex;
use std::path::Path;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::adapter_failure;
use crate::error::{PipelineError, Result};
use crate::models::Transcript;
use crate::pipeline::retry::{with_retry, RetryError};
use crate::pipeline::PipelineSettings;
use crate::services::transcription::TranscriptDocument;
use crate::services::{ObjectStorage, StorageError, TranscriptionJobStatus, TranscriptionService};

const TRANSCRIPT_PREFIX: &str = "transcripts/";

pub fn job_name(job_id: &str) -> String {
    format!("job_{}", job_id)
}

pub fn output_key(job_name: &str) -> String {
    format!("{}{}.json", TRANSCRIPT_PREFIX, job_name)
}

/// Job name without the `job_`/`transcribe_` prefix or a trailing
/// `_YYYYMMDD_HHMMSS` stamp
pub fn clean_job_name(job_name: &str) -> String {
    let name = job_name
        .strip_prefix("job_")
        .or_else(|| job_name.strip_prefix("transcribe_"))
        .unwrap_or(job_name);

    if let Ok(re) = Regex::new(r"_\d{8}_\d{6}$") {
        re.replace(name, "").into_owned()
    } else {
        name.to_string()
    }
}

/// Newest result document whose key mentions the clean job name
pub fn pick_fallback_key(keys: &[String], clean_name: &str) -> Option<String> {
    let mut candidates: Vec<&String> = keys
        .iter()
        .filter(|key| key.ends_with(".json") && key.contains(clean_name))
        .collect();
    candidates.sort_by(|a, b| b.cmp(a));
    candidates.first().map(|key| key.to_string())
}

/// Run a transcription job to completion and load its transcript
pub async fn transcribe(
    transcription: &dyn TranscriptionService,
    storage: &dyn ObjectStorage,
    settings: &PipelineSettings,
    job_id: &str,
    media_locator: &str,
    scratch_dir: &Path,
) -> Result<Transcript> {
    let name = job_name(job_id);
    let key = output_key(&name);

    with_retry(&settings.retry, "Transcription start", || {
        transcription.start_job(&name, media_locator, &key)
    })
    .await
    .map_err(|e| {
        e.into_pipeline("Transcription start", |e| {
            adapter_failure(e, PipelineError::Transcription)
        })
    })?;

    info!("🎤 Job {}: transcription job {} started", job_id, name);

    wait_for_completion(transcription, settings, job_id, &name).await?;

    let local_path = scratch_dir.join(format!("{}.json", name));
    fetch_document(storage, settings, job_id, &name, &key, &local_path).await?;

    let bytes = tokio::fs::read(&local_path).await?;
    let transcript = TranscriptDocument::parse(&bytes)?.into_transcript()?;

    match &transcript.language {
        Some(language) => info!("✅ Job {}: transcribed, detected {}", job_id, language.describe()),
        None => info!("✅ Job {}: transcribed", job_id),
    }
    Ok(transcript)
}

async fn wait_for_completion(
    transcription: &dyn TranscriptionService,
    settings: &PipelineSettings,
    job_id: &str,
    name: &str,
) -> Result<()> {
    let started = Instant::now();

    loop {
        let job = with_retry(&settings.retry, "Transcription status", || {
            transcription.job_status(name)
        })
        .await
        .map_err(|e| {
            e.into_pipeline("Transcription status", |e| {
                adapter_failure(e, PipelineError::Transcription)
            })
        })?;

        match job.status {
            TranscriptionJobStatus::Completed => return Ok(()),
            TranscriptionJobStatus::Failed => {
                let reason = job
                    .failure_reason
                    .unwrap_or_else(|| "no reason given".to_string());
                return Err(PipelineError::Transcription(format!(
                    "job {} failed: {}",
                    name, reason
                )));
            }
            TranscriptionJobStatus::Queued | TranscriptionJobStatus::InProgress => {}
        }

        if let Some(max_wait) = settings.max_wait {
            let elapsed = started.elapsed();
            if elapsed >= max_wait {
                return Err(PipelineError::Timeout {
                    operation: format!("Transcription job {}", name),
                    elapsed,
                });
            }
        }

        debug!("Job {}: transcription {:?}, polling again", job_id, job.status);
        tokio::time::sleep(settings.poll_interval).await;
    }
}

/// Download the result document, falling back to the newest matching key
/// under `transcripts/` when the expected one is missing.
async fn fetch_document(
    storage: &dyn ObjectStorage,
    settings: &PipelineSettings,
    job_id: &str,
    name: &str,
    key: &str,
    local_path: &Path,
) -> Result<()> {
    let storage_failure = |e: StorageError| PipelineError::Transcription(e.to_string());

    match with_retry(&settings.retry, "Transcript download", || storage.get(key, local_path)).await {
        Ok(()) => return Ok(()),
        Err(RetryError::Failed(StorageError::NotFound(_))) => {
            warn!("Job {}: {} not found, searching {}", job_id, key, TRANSCRIPT_PREFIX);
        }
        Err(e) => return Err(e.into_pipeline("Transcript download", storage_failure)),
    }

    let keys = with_retry(&settings.retry, "Transcript listing", || storage.list(TRANSCRIPT_PREFIX))
        .await
        .map_err(|e| e.into_pipeline("Transcript listing", storage_failure))?;

    let clean_name = clean_job_name(name);
    let fallback = pick_fallback_key(&keys, &clean_name).ok_or_else(|| {
        PipelineError::Transcription(format!("no transcript document found for {}", clean_name))
    })?;

    info!("Job {}: using transcript document {}", job_id, fallback);
    with_retry(&settings.retry, "Transcript download", || storage.get(&fallback, local_path))
        .await
        .map_err(|e| e.into_pipeline("Transcript download", storage_failure))
}
