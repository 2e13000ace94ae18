use std::path::Path;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pipeline::retry::{with_retry, RetryPolicy};
use crate::services::ObjectStorage;

/// Storage key of the published localized video
pub fn localized_key(job_id: &str) -> String {
    format!("localized/{}_localized.mp4", job_id)
}

pub async fn publish(
    storage: &dyn ObjectStorage,
    retry: &RetryPolicy,
    job_id: &str,
    localized_path: &Path,
) -> Result<String> {
    let key = localized_key(job_id);

    let locator = with_retry(retry, "Publish", || storage.put(localized_path, &key))
        .await
        .map_err(|e| e.into_pipeline("Publish", |e| PipelineError::Publish(e.to_string())))?;

    info!("📤 Job {}: published {}", job_id, locator);
    Ok(locator)
}
