//! Transcription service adapter and result document types

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::TranscriptionConfig;
use crate::error::PipelineError;
use crate::models::{DetectedLanguage, Transcript};

/// Status reported for a transcription job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranscriptionJobStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl TranscriptionJobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionJob {
    pub status: TranscriptionJobStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl TranscriptionJob {
    /// Decode a status body; anything outside the schema is malformed
    pub fn parse(body: &str) -> std::result::Result<Self, PipelineError> {
        serde_json::from_str(body).map_err(|e| PipelineError::malformed("transcription", e.to_string()))
    }
}

#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Start an asynchronous job writing its result document to `output_key`
    async fn start_job(&self, job_name: &str, media_locator: &str, output_key: &str) -> Result<()>;

    async fn job_status(&self, job_name: &str) -> Result<TranscriptionJob>;
}

#[derive(Debug, Serialize)]
struct StartJobRequest<'a> {
    job_name: &'a str,
    media_uri: &'a str,
    media_format: &'a str,
    output_key: &'a str,
    identify_language: bool,
}

/// JSON-over-HTTP transcription client
pub struct HttpTranscriptionService {
    config: TranscriptionConfig,
    client: reqwest::Client,
}

impl HttpTranscriptionService {
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }
}

#[async_trait]
impl TranscriptionService for HttpTranscriptionService {
    async fn start_job(&self, job_name: &str, media_locator: &str, output_key: &str) -> Result<()> {
        let url = format!("{}/jobs", self.config.endpoint.trim_end_matches('/'));
        let request = StartJobRequest {
            job_name,
            media_uri: media_locator,
            media_format: &self.config.media_format,
            output_key,
            identify_language: self.config.identify_language,
        };

        debug!("Starting transcription job {} at {}", job_name, url);

        let response = self.authorize(self.client.post(&url)).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Transcription API error {}: {}", status, text));
        }

        Ok(())
    }

    async fn job_status(&self, job_name: &str) -> Result<TranscriptionJob> {
        let url = format!(
            "{}/jobs/{}",
            self.config.endpoint.trim_end_matches('/'),
            job_name
        );

        let response = self.authorize(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Transcription API error {}: {}", status, text));
        }

        let body = response.text().await?;
        Ok(TranscriptionJob::parse(&body)?)
    }
}

/// Result document written to object storage by a completed job
#[derive(Debug, Deserialize)]
pub struct TranscriptDocument {
    pub results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptResults {
    pub transcripts: Vec<TranscriptText>,
    #[serde(default)]
    pub language_identification: Vec<LanguageIdentification>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptText {
    pub transcript: String,
}

#[derive(Debug, Deserialize)]
pub struct LanguageIdentification {
    #[serde(alias = "language_code")]
    pub code: String,
    #[serde(default, deserialize_with = "score_from_string_or_number")]
    pub score: Option<f64>,
}

fn score_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Score {
        Number(f64),
        Text(String),
    }

    match Option::<Score>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Score::Number(n)) => Ok(Some(n)),
        Some(Score::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl TranscriptDocument {
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, PipelineError> {
        serde_json::from_slice(bytes)
            .map_err(|e| PipelineError::malformed("transcription", e.to_string()))
    }

    pub fn into_transcript(self) -> std::result::Result<Transcript, PipelineError> {
        let mut results = self.results;
        if results.transcripts.is_empty() {
            return Err(PipelineError::malformed(
                "transcription",
                "results.transcripts is empty",
            ));
        }
        let text = results.transcripts.swap_remove(0).transcript;
        let language = results
            .language_identification
            .into_iter()
            .next()
            .map(|id| DetectedLanguage {
                code: id.code,
                score: id.score,
            });

        Ok(Transcript::new(text).with_language(language))
    }
}
