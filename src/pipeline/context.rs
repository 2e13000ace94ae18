//! Accumulated state of one job as it moves through the stages

use std::path::PathBuf;

use crate::error::{PipelineError, Result};
use crate::models::{DetectedLanguage, LocalizationResult, QualityReport, Transcript, Translation};

/// Immutable description of a job handed to the orchestrator
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub job_id: String,
    pub target_lang: String,
    /// Local copy of the source media
    pub source_path: PathBuf,
    /// Sanitized original file name
    pub source_name: String,
}

#[derive(Debug, Clone)]
pub struct JobContext {
    pub spec: JobSpec,
    pub media_locator: Option<String>,
    pub transcript: Option<Transcript>,
    pub translation: Option<Translation>,
    pub quality_report: Option<QualityReport>,
    pub audio_path: Option<PathBuf>,
    pub localized_path: Option<PathBuf>,
    pub video_locator: Option<String>,
}

fn missing(what: &str) -> PipelineError {
    PipelineError::Workspace(format!("{} not available to this stage", what))
}

impl JobContext {
    pub fn new(spec: JobSpec) -> Self {
        Self {
            spec,
            media_locator: None,
            transcript: None,
            translation: None,
            quality_report: None,
            audio_path: None,
            localized_path: None,
            video_locator: None,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.spec.job_id
    }

    pub fn media_locator(&self) -> Result<&str> {
        self.media_locator.as_deref().ok_or_else(|| missing("media locator"))
    }

    pub fn transcript(&self) -> Result<&Transcript> {
        self.transcript.as_ref().ok_or_else(|| missing("transcript"))
    }

    pub fn translation(&self) -> Result<&Translation> {
        self.translation.as_ref().ok_or_else(|| missing("translation"))
    }

    pub fn audio_path(&self) -> Result<&PathBuf> {
        self.audio_path.as_ref().ok_or_else(|| missing("synthesized audio"))
    }

    pub fn localized_path(&self) -> Result<&PathBuf> {
        self.localized_path.as_ref().ok_or_else(|| missing("localized video"))
    }

    /// Assemble the final deliverable once every stage has run or been
    /// restored.
    pub fn into_result(self) -> Result<LocalizationResult> {
        let video_locator = self.video_locator.ok_or_else(|| missing("video locator"))?;
        let transcript = self.transcript.ok_or_else(|| missing("transcript"))?;
        let translation = self.translation.ok_or_else(|| missing("translation"))?;
        let detected_language: Option<DetectedLanguage> = transcript.language;

        Ok(LocalizationResult {
            video_locator,
            transcript: transcript.text,
            translation: translation.text,
            quality_report: self.quality_report.unwrap_or_default(),
            detected_language,
        })
    }
}
