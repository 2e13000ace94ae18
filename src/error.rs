//! Error types for the localization pipeline

use std::time::Duration;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Fatal stage failures. Any of these aborts the remaining stages and marks
/// the job as failed with the error's display text.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Media merge failed: {0}")]
    Merge(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Malformed response from {service}: {detail}")]
    MalformedResponse { service: &'static str, detail: String },

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout { operation: String, elapsed: Duration },

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn malformed(service: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            service,
            detail: detail.into(),
        }
    }
}

/// Errors raised by the submission boundary
#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job store error: {0}")]
    Store(#[from] crate::state::StoreError),
}
