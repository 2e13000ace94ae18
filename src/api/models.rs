//! API data models

use serde::{Deserialize, Serialize};

use crate::service::Submission;

/// Body returned when a localization job is accepted
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub message: String,
    pub job_id: String,
    pub status_url: String,
}

impl From<Submission> for SubmitResponse {
    fn from(submission: Submission) -> Self {
        Self {
            message: "Localization job started.".to_string(),
            job_id: submission.job_id,
            status_url: submission.status_url,
        }
    }
}

/// Error body for every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
