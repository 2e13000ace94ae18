//! In-process adapters with call counters for exercising the pipeline

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use video_localizer::media::MediaMuxer;
use video_localizer::pipeline::{PipelineSettings, RetryPolicy};
use video_localizer::service::LocalizationService;
use video_localizer::services::llm::LLMResponse;
use video_localizer::services::transcription::{TranscriptionJob, TranscriptionJobStatus};
use video_localizer::services::{
    InferenceConfig, LLMProvider, LanguageModel, LocalObjectStore, Services, SpeechSynthesizer,
    TranscriptionService,
};
use video_localizer::state::{InMemoryJobStore, JobRecord, JobStore};
use video_localizer::voice::Engine;

pub const BUCKET: &str = "test-bucket";

/// Transcription service that writes its result document straight into the
/// bucket once it reports completion
pub struct MockTranscription {
    bucket_root: PathBuf,
    pub transcript: String,
    pub language: Option<(String, String)>,
    pub polls_before_done: usize,
    pub fail: bool,
    pub never_finish: bool,
    /// Write the document here instead of the requested key
    pub write_key: Option<String>,
    pub starts: AtomicUsize,
    pub polls: AtomicUsize,
    /// Output key and poll count per running job
    pending: Mutex<HashMap<String, (String, usize)>>,
}

impl MockTranscription {
    pub fn new(bucket_root: PathBuf, transcript: &str) -> Self {
        Self {
            bucket_root,
            transcript: transcript.to_string(),
            language: Some(("en-US".to_string(), "0.98".to_string())),
            polls_before_done: 1,
            fail: false,
            never_finish: false,
            write_key: None,
            starts: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn write_document(&self, key: &str) -> Result<()> {
        let language = match &self.language {
            Some((code, score)) => serde_json::json!([{"code": code, "score": score}]),
            None => serde_json::json!([]),
        };
        let document = serde_json::json!({
            "results": {
                "transcripts": [{"transcript": self.transcript}],
                "language_identification": language,
            }
        });
        let path = self.bucket_root.join(key);
        std::fs::create_dir_all(path.parent().ok_or_else(|| anyhow!("bad key"))?)?;
        std::fs::write(path, serde_json::to_vec(&document)?)?;
        Ok(())
    }
}

#[async_trait]
impl TranscriptionService for MockTranscription {
    async fn start_job(&self, job_name: &str, _media_locator: &str, output_key: &str) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let key = self.write_key.clone().unwrap_or_else(|| output_key.to_string());
        self.pending.lock().unwrap().insert(job_name.to_string(), (key, 0));
        Ok(())
    }

    async fn job_status(&self, job_name: &str) -> Result<TranscriptionJob> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let (key, polls) = {
            let mut pending = self.pending.lock().unwrap();
            let entry = pending
                .get_mut(job_name)
                .ok_or_else(|| anyhow!("unknown job {}", job_name))?;
            entry.1 += 1;
            entry.clone()
        };

        if self.never_finish || polls < self.polls_before_done {
            return Ok(TranscriptionJob {
                status: if polls == 1 {
                    TranscriptionJobStatus::Queued
                } else {
                    TranscriptionJobStatus::InProgress
                },
                failure_reason: None,
            });
        }

        if self.fail {
            return Ok(TranscriptionJob {
                status: TranscriptionJobStatus::Failed,
                failure_reason: Some("unsupported media".to_string()),
            });
        }

        self.write_document(&key)?;
        Ok(TranscriptionJob {
            status: TranscriptionJobStatus::Completed,
            failure_reason: None,
        })
    }
}

/// Language model answering translation and analysis prompts from canned
/// replies
pub struct MockModel {
    pub translation: std::result::Result<String, String>,
    pub analysis: std::result::Result<String, String>,
    pub translations: AtomicUsize,
    pub analyses: AtomicUsize,
}

impl MockModel {
    pub fn new(translation: &str) -> Self {
        Self {
            translation: Ok(translation.to_string()),
            analysis: Ok(r#"{"potential_issues": []}"#.to_string()),
            translations: AtomicUsize::new(0),
            analyses: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn invoke(&self, system: &str, _user_text: &str, _inference: &InferenceConfig) -> Result<LLMResponse> {
        let reply = if system.starts_with("You are an expert translator") {
            self.translations.fetch_add(1, Ordering::SeqCst);
            &self.translation
        } else {
            self.analyses.fetch_add(1, Ordering::SeqCst);
            &self.analysis
        };

        match reply {
            Ok(text) => Ok(LLMResponse {
                content: text.clone(),
                tokens_used: Some(42),
            }),
            Err(e) => Err(anyhow!(e.clone())),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Bedrock
    }
}

/// Speech synthesizer recording the requested voices
#[derive(Default)]
pub struct MockSpeech {
    pub requests: Mutex<Vec<(String, Engine, String)>>,
    pub empty_audio: bool,
}

impl MockSpeech {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_voice(&self) -> Option<(String, Engine)> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|(voice, engine, _)| (voice.clone(), *engine))
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, text: &str, voice_id: &str, engine: Engine, output_format: &str) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .unwrap()
            .push((voice_id.to_string(), engine, output_format.to_string()));
        if self.empty_audio {
            return Ok(Vec::new());
        }
        Ok(format!("MP3:{}", text).into_bytes())
    }
}

/// Muxer concatenating its inputs into the output file
#[derive(Default)]
pub struct MockMuxer {
    pub calls: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl MediaMuxer for MockMuxer {
    async fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            // Encoders write as they go, so a crash leaves a partial file
            tokio::fs::write(output, b"TRUNC").await?;
            return Err(anyhow!("encoder crashed"));
        }
        let mut merged = tokio::fs::read(video).await?;
        merged.extend(tokio::fs::read(audio).await?);
        tokio::fs::write(output, merged).await?;
        Ok(output.to_path_buf())
    }
}

pub fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        poll_interval: Duration::from_millis(5),
        max_wait: Some(Duration::from_secs(5)),
        retry: RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(1),
            call_timeout: None,
        },
        inference: InferenceConfig::default(),
        speech_format: "mp3".to_string(),
    }
}

/// Everything a test needs to drive jobs and inspect adapter calls
pub struct Harness {
    pub temp_dir: TempDir,
    pub storage: Arc<LocalObjectStore>,
    pub transcription: Arc<MockTranscription>,
    pub model: Arc<MockModel>,
    pub speech: Arc<MockSpeech>,
    pub muxer: Arc<MockMuxer>,
    pub store: Arc<InMemoryJobStore>,
    pub settings: PipelineSettings,
}

impl Harness {
    pub fn new(transcript: &str, translation: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let bucket_root = temp_dir.path().join("bucket");
        Self {
            storage: Arc::new(LocalObjectStore::new(BUCKET, bucket_root.clone())),
            transcription: Arc::new(MockTranscription::new(bucket_root, transcript)),
            model: Arc::new(MockModel::new(translation)),
            speech: Arc::new(MockSpeech::default()),
            muxer: Arc::new(MockMuxer::default()),
            store: Arc::new(InMemoryJobStore::new()),
            settings: fast_settings(),
            temp_dir,
        }
    }

    pub fn bucket_root(&self) -> PathBuf {
        self.temp_dir.path().join("bucket")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.temp_dir.path().join("work")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.temp_dir.path().join("output")
    }

    pub fn services(&self) -> Services {
        Services {
            storage: self.storage.clone(),
            transcription: self.transcription.clone(),
            language_model: self.model.clone(),
            speech: self.speech.clone(),
            muxer: self.muxer.clone(),
        }
    }

    /// Service over a fresh job store, sharing adapters and directories
    pub fn service_with_store(&self, store: Arc<dyn JobStore>) -> LocalizationService {
        LocalizationService::new(self.services(), store, self.settings.clone(), self.work_dir(), 2)
    }

    pub fn service(&self) -> LocalizationService {
        self.service_with_store(self.store.clone())
    }

    /// Write a small fake video and return its path
    pub fn source_video(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, b"FAKEVIDEO").unwrap();
        path
    }

    /// Number of entries left in the work directory
    pub fn leftover_workspaces(&self) -> usize {
        match std::fs::read_dir(self.work_dir()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

/// Poll until the job reaches a terminal status
pub async fn wait_for_terminal(service: &LocalizationService, job_id: &str) -> JobRecord {
    for _ in 0..500 {
        if let Some(record) = service.get_status(job_id).await.unwrap() {
            if record.status.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish", job_id);
}
