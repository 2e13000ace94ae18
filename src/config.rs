use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::services::llm::LLMProvider;

/// Configuration for the video localizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Submission service settings
    pub service: ServiceConfig,

    /// Object storage settings
    pub storage: StorageConfig,

    /// Transcription service settings
    pub transcription: TranscriptionConfig,

    /// Language model settings (translation and quality analysis)
    pub llm: LLMConfig,

    /// Speech synthesis settings
    pub speech: SpeechConfig,

    /// Media muxing settings
    pub media: MediaConfig,

    /// Pipeline behavior
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Port for the HTTP API
    pub port: u16,

    /// Maximum number of jobs running at the same time
    pub max_concurrent_jobs: usize,

    /// Parent directory for per-job working directories
    pub work_dir: PathBuf,

    /// Persist job records here instead of keeping them in memory
    pub state_dir: Option<PathBuf>,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket name used in storage locators
    pub bucket: String,

    /// Local directory backing the bucket
    pub root_dir: PathBuf,

    /// Region reported for the bucket
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Base URL of the transcription service
    pub endpoint: String,

    /// API key for the transcription service
    pub api_key: Option<String>,

    /// Container format of the submitted media
    pub media_format: String,

    /// Let the service identify the spoken language
    pub identify_language: bool,

    /// Interval between job status polls (seconds)
    pub poll_interval_secs: u64,

    /// Give up polling after this many seconds (0 = wait indefinitely)
    pub max_wait_secs: u64,

    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

/// LLM configuration for translation and analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// LLM provider to use
    pub provider: LLMProvider,

    /// API endpoint (for Bedrock, LMStudio and custom providers)
    pub endpoint: Option<String>,

    /// API key (for cloud providers)
    pub api_key: Option<String>,

    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    /// Nucleus sampling cutoff
    pub top_p: f32,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Base URL of the speech synthesis service
    pub endpoint: String,

    /// API key for the speech service
    pub api_key: Option<String>,

    /// Audio encoding requested from the service
    pub output_format: String,

    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,

    /// Video codec for the localized output
    pub video_codec: String,

    /// Audio codec for the localized output
    pub audio_codec: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root for persisted per-job artifacts used by resumable runs
    pub artifacts_dir: PathBuf,

    /// Attempts per external call before giving up
    pub max_retries: u32,

    /// Fixed delay between attempts (milliseconds)
    pub retry_delay_ms: u64,

    /// Timeout for a single external call (seconds, 0 = none)
    pub call_timeout_secs: u64,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = [
            "video-localizer.toml",
            "config/video-localizer.toml",
            "/etc/video-localizer/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config.with_env_overrides());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load a specific configuration file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&config_str)?;
        Ok(config.with_env_overrides())
    }

    /// Defaults with environment variable overrides
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(bucket) = std::env::var("S3_BUCKET_NAME") {
            self.storage.bucket = bucket;
        }

        if let Ok(region) = std::env::var("AWS_DEFAULT_REGION") {
            self.storage.region = region;
        }

        if let Ok(root) = std::env::var("LOCALIZER_STORAGE_DIR") {
            self.storage.root_dir = PathBuf::from(root);
        }

        if let Ok(port) = std::env::var("LOCALIZER_PORT") {
            self.service.port = port.parse().unwrap_or(self.service.port);
        }

        if let Ok(jobs) = std::env::var("LOCALIZER_MAX_JOBS") {
            self.service.max_concurrent_jobs = jobs.parse().unwrap_or(self.service.max_concurrent_jobs);
        }

        if let Ok(endpoint) = std::env::var("LOCALIZER_TRANSCRIBE_ENDPOINT") {
            self.transcription.endpoint = endpoint;
        }

        if let Ok(endpoint) = std::env::var("LOCALIZER_SPEECH_ENDPOINT") {
            self.speech.endpoint = endpoint;
        }

        if let Ok(endpoint) = std::env::var("LOCALIZER_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }

        if self.llm.provider == LLMProvider::Bedrock {
            if let Ok(api_key) = std::env::var("AWS_BEARER_TOKEN_BEDROCK") {
                self.llm.api_key = Some(api_key);
            }
        }

        if let Ok(api_key) = std::env::var("LOCALIZER_LLM_API_KEY") {
            self.llm.api_key = Some(api_key);
        }

        if let Ok(api_key) = std::env::var("LOCALIZER_API_KEY") {
            self.transcription.api_key.get_or_insert(api_key.clone());
            self.speech.api_key.get_or_insert(api_key);
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.service.max_concurrent_jobs == 0 {
            return Err(anyhow!("max_concurrent_jobs must be greater than 0"));
        }

        if self.storage.bucket.trim().is_empty() {
            return Err(anyhow!("storage bucket must not be empty"));
        }

        if self.transcription.poll_interval_secs == 0 {
            return Err(anyhow!("poll_interval_secs must be greater than 0"));
        }

        if self.pipeline.max_retries == 0 {
            return Err(anyhow!("max_retries must be at least 1"));
        }

        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(anyhow!("top_p must be between 0 and 1"));
        }

        match self.llm.provider {
            LLMProvider::Bedrock => {
                // The public endpoint is used when none is configured
                if self.llm.api_key.is_none() && self.llm.endpoint.is_none() {
                    tracing::warn!(
                        "No Bedrock API key configured, set AWS_BEARER_TOKEN_BEDROCK or LOCALIZER_LLM_API_KEY"
                    );
                }
            }
            LLMProvider::OpenAI | LLMProvider::Gemini => {
                if self.llm.api_key.is_none() {
                    return Err(anyhow!("API key required for {:?} provider", self.llm.provider));
                }
            }
            LLMProvider::LMStudio => {
                if self.llm.endpoint.is_none() {
                    return Err(anyhow!("Endpoint required for LMStudio provider"));
                }
            }
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video Localizer Configuration:\n\
            - Max concurrent jobs: {}\n\
            - Bucket: {} ({})\n\
            - Transcription endpoint: {}\n\
            - LLM: {:?} / {}\n\
            - Speech endpoint: {}\n\
            - Codecs: {}/{}\n\
            - Artifacts: {}",
            self.service.max_concurrent_jobs,
            self.storage.bucket,
            self.storage.root_dir.display(),
            self.transcription.endpoint,
            self.llm.provider,
            self.llm.model,
            self.speech.endpoint,
            self.media.video_codec,
            self.media.audio_codec,
            self.pipeline.artifacts_dir.display(),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                port: 8000,
                max_concurrent_jobs: num_cpus::get().min(8),
                work_dir: std::env::temp_dir().join("video-localizer"),
                state_dir: None,
                max_upload_bytes: 2 * 1024 * 1024 * 1024, // 2GB
            },
            storage: StorageConfig {
                bucket: "video-bucket".to_string(),
                root_dir: PathBuf::from("./storage"),
                region: "us-east-1".to_string(),
            },
            transcription: TranscriptionConfig {
                endpoint: "http://localhost:9000".to_string(),
                api_key: None,
                media_format: "mp4".to_string(),
                identify_language: true,
                poll_interval_secs: 10,
                max_wait_secs: 3600, // 1 hour for long videos
                timeout_secs: 30,
            },
            llm: LLMConfig {
                provider: LLMProvider::Bedrock,
                endpoint: None,
                api_key: None,
                model: "us.amazon.nova-pro-v1:0".to_string(),
                max_tokens: 4096,
                temperature: 0.1, // Low temperature for consistent translations
                top_p: 0.9,
                timeout_seconds: 120,
            },
            speech: SpeechConfig {
                endpoint: "http://localhost:9001".to_string(),
                api_key: None,
                output_format: "mp3".to_string(),
                timeout_secs: 120,
            },
            media: MediaConfig {
                ffmpeg_path: PathBuf::from("ffmpeg"),
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
            },
            pipeline: PipelineConfig {
                artifacts_dir: PathBuf::from("./output"),
                max_retries: 3,
                retry_delay_ms: 2000,
                call_timeout_secs: 600,
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_max_concurrent_jobs(mut self, jobs: usize) -> Self {
        self.config.service.max_concurrent_jobs = jobs;
        self
    }

    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.config.service.work_dir = dir;
        self
    }

    pub fn with_storage_root(mut self, dir: PathBuf) -> Self {
        self.config.storage.root_dir = dir;
        self
    }

    pub fn with_bucket(mut self, bucket: String) -> Self {
        self.config.storage.bucket = bucket;
        self
    }

    pub fn with_artifacts_dir(mut self, dir: PathBuf) -> Self {
        self.config.pipeline.artifacts_dir = dir;
        self
    }

    pub fn with_llm_provider(mut self, provider: LLMProvider) -> Self {
        self.config.llm.provider = provider;
        self
    }

    pub fn with_llm_api_key(mut self, api_key: String) -> Self {
        self.config.llm.api_key = Some(api_key);
        self
    }

    pub fn with_poll_interval(mut self, seconds: u64) -> Self {
        self.config.transcription.poll_interval_secs = seconds;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
