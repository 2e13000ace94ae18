//! API request handlers

use axum::extract::Multipart;
use axum::http::StatusCode;
use serde_json::Value;

use super::models::{ErrorResponse, SubmitResponse};
use crate::error::SubmitError;
use crate::service::LocalizationService;
use crate::state::JobRecord;

/// Handle health check requests
pub async fn health_check(service: &LocalizationService) -> Value {
    let jobs = service
        .stats()
        .await
        .ok()
        .and_then(|stats| serde_json::to_value(stats).ok());
    let language_model = service.language_model_status().await;

    serde_json::json!({
        "status": "healthy",
        "service": "video-localizer",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "jobs": jobs,
        "language_model": language_model,
    })
}

/// Uploaded media plus the requested language
#[derive(Debug, Default)]
pub struct LocalizeForm {
    pub filename: Option<String>,
    pub media: Vec<u8>,
    pub target_lang: Option<String>,
}

/// Collect the `file` and `target_lang` fields of a multipart upload
pub async fn read_localize_form(mut multipart: Multipart) -> Result<LocalizeForm, (StatusCode, ErrorResponse)> {
    let bad_request = |e: String| (StatusCode::BAD_REQUEST, ErrorResponse::new(e));
    let mut form = LocalizeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                form.filename = field.file_name().map(str::to_string);
                form.media = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(e.to_string()))?
                    .to_vec();
            }
            Some("target_lang") => {
                form.target_lang = Some(field.text().await.map_err(|e| bad_request(e.to_string()))?);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Handle a localization request
pub async fn localize(
    service: &LocalizationService,
    form: LocalizeForm,
) -> Result<SubmitResponse, (StatusCode, ErrorResponse)> {
    let filename = form
        .filename
        .ok_or_else(|| (StatusCode::BAD_REQUEST, ErrorResponse::new("file field is required")))?;
    let target_lang = form
        .target_lang
        .ok_or_else(|| (StatusCode::BAD_REQUEST, ErrorResponse::new("target_lang field is required")))?;

    match service.submit(&form.media, &filename, &target_lang).await {
        Ok(submission) => Ok(submission.into()),
        Err(SubmitError::InvalidRequest(msg)) => Err((StatusCode::BAD_REQUEST, ErrorResponse::new(msg))),
        Err(e) => {
            tracing::error!("Failed to accept job: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(e.to_string())))
        }
    }
}

/// Handle job status requests
pub async fn job_status(
    service: &LocalizationService,
    job_id: &str,
) -> Result<JobRecord, (StatusCode, ErrorResponse)> {
    match service.get_status(job_id).await {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Err((StatusCode::NOT_FOUND, ErrorResponse::new("Job ID not found."))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(e.to_string()))),
    }
}
