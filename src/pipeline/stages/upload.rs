use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pipeline::context::JobSpec;
use crate::pipeline::retry::{with_retry, RetryPolicy};
use crate::services::ObjectStorage;

/// Storage key of the uploaded source media
pub fn media_key(job_id: &str, source_name: &str) -> String {
    format!("videos/{}_{}", job_id, source_name)
}

/// Copy the source media to object storage and return its locator
pub async fn upload_source(storage: &dyn ObjectStorage, retry: &RetryPolicy, spec: &JobSpec) -> Result<String> {
    let key = media_key(&spec.job_id, &spec.source_name);

    let locator = with_retry(retry, "Source upload", || storage.put(&spec.source_path, &key))
        .await
        .map_err(|e| e.into_pipeline("Source upload", |e| PipelineError::Upload(e.to_string())))?;

    info!("📤 Job {}: uploaded source to {}", spec.job_id, locator);
    Ok(locator)
}
