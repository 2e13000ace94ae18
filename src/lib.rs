//! Video Localizer
//!
//! Turns a source video into a dubbed version in another language: the
//! speech is transcribed, translated, checked for mistranslated idioms,
//! synthesized in the target language and muxed back into the video.
//! Jobs run in the background and report progress through a job store.

pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod services;
pub mod state;
pub mod voice;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{PipelineError, SubmitError};
pub use crate::media::{FfmpegMuxer, MediaMuxer};
pub use crate::models::{Issue, IssueCategory, LocalizationResult, QualityReport, Transcript, Translation};
pub use crate::pipeline::{Orchestrator, PipelineSettings, RunOptions, Stage};
pub use crate::service::{LocalizationService, Submission};
pub use crate::services::Services;
pub use crate::state::{FileJobStore, InMemoryJobStore, JobRecord, JobStatus, JobStore};
pub use crate::voice::{Engine, VoiceProfile};
