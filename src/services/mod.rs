//! Adapters for the external collaborators of the pipeline

pub mod llm;
pub mod speech;
pub mod storage;
pub mod transcription;

use std::sync::Arc;

pub use llm::{create_language_model, InferenceConfig, LanguageModel, LLMProvider};
pub use speech::{HttpSpeechSynthesizer, SpeechSynthesizer};
pub use storage::{LocalObjectStore, ObjectStorage, StorageError};
pub use transcription::{HttpTranscriptionService, TranscriptionJobStatus, TranscriptionService};

use crate::media::MediaMuxer;

/// Bundle of adapters handed to the orchestrator
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<dyn ObjectStorage>,
    pub transcription: Arc<dyn TranscriptionService>,
    pub language_model: Arc<dyn LanguageModel>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub muxer: Arc<dyn MediaMuxer>,
}

impl Services {
    /// Concrete adapters described by the configuration
    pub fn from_config(config: &crate::config::Config) -> anyhow::Result<Self> {
        Ok(Self {
            storage: Arc::new(LocalObjectStore::new(
                config.storage.bucket.clone(),
                config.storage.root_dir.clone(),
            )),
            transcription: Arc::new(HttpTranscriptionService::new(config.transcription.clone())?),
            language_model: Arc::from(create_language_model(&config.llm)?),
            speech: Arc::new(HttpSpeechSynthesizer::new(config.speech.clone())?),
            muxer: Arc::new(crate::media::FfmpegMuxer::new(&config.media)),
        })
    }
}
