//! Job orchestration: stage functions, idempotent re-entry and cleanup

pub mod artifacts;
pub mod context;
pub mod orchestrator;
pub mod retry;
pub mod stage;
pub mod stages;
pub mod workspace;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

pub use artifacts::ArtifactStore;
pub use context::{JobContext, JobSpec};
pub use orchestrator::Orchestrator;
pub use retry::RetryPolicy;
pub use stage::Stage;
pub use workspace::Workspace;

use crate::config::Config;
use crate::services::InferenceConfig;

/// Tunables shared by every stage
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub poll_interval: Duration,
    /// Upper bound on transcription polling; `None` waits indefinitely
    pub max_wait: Option<Duration>,
    pub retry: RetryPolicy,
    pub inference: InferenceConfig,
    pub speech_format: String,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.transcription.poll_interval_secs),
            max_wait: (config.transcription.max_wait_secs > 0)
                .then(|| Duration::from_secs(config.transcription.max_wait_secs)),
            retry: RetryPolicy::from_config(&config.pipeline),
            inference: InferenceConfig::from(&config.llm),
            speech_format: config.speech.output_format.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// How a single run treats existing artifacts
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Persist artifacts under `<artifacts_root>/<job_id>` and skip stages
    /// whose artifact already exists
    pub resumable: bool,
    pub artifacts_root: Option<PathBuf>,
    /// Stages to execute even when their artifact exists
    pub force: HashSet<Stage>,
}

impl RunOptions {
    pub fn resumable(artifacts_root: PathBuf) -> Self {
        Self {
            resumable: true,
            artifacts_root: Some(artifacts_root),
            force: HashSet::new(),
        }
    }

    pub fn with_force(mut self, stage: Stage) -> Self {
        self.force.insert(stage);
        self
    }
}
