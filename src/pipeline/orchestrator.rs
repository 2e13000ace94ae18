//! Sequences the stages of one job and records the outcome
//!
//! Stage order is fixed: upload, transcribe, translate, analyze, synthesize,
//! merge, publish. A fatal error stops the run and marks the job failed;
//! the workspace is removed on every exit path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::artifacts::ArtifactStore;
use super::context::{JobContext, JobSpec};
use super::stage::{Stage, TRANSCRIPT_LANGUAGE_ARTIFACT};
use super::stages::{analyze, merge, publish, synthesize, transcribe, translate, upload};
use super::workspace::Workspace;
use super::{PipelineSettings, RunOptions};
use crate::error::Result;
use crate::models::{DetectedLanguage, LocalizationResult, QualityReport, Transcript, Translation};
use crate::services::Services;
use crate::state::{JobRecord, JobStore, JobUpdate, StoreError};

pub struct Orchestrator {
    services: Services,
    store: Arc<dyn JobStore>,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(services: Services, store: Arc<dyn JobStore>, settings: PipelineSettings) -> Self {
        Self {
            services,
            store,
            settings,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run every stage for `spec`, mark the job completed or failed, and
    /// remove the workspace. The job record must already exist.
    pub async fn run(
        &self,
        spec: JobSpec,
        workspace: Workspace,
        options: RunOptions,
    ) -> std::result::Result<JobRecord, StoreError> {
        let start_time = Instant::now();
        let job_id = spec.job_id.clone();
        info!("🚀 Job {}: localizing {} to {}", job_id, spec.source_name, spec.target_lang);

        let update = match self.execute(spec, &workspace, &options).await {
            Ok(result) => {
                info!(
                    "🎉 Job {}: completed in {:.1}s, video at {}",
                    job_id,
                    start_time.elapsed().as_secs_f64(),
                    result.video_locator
                );
                JobUpdate::Completed(result)
            }
            Err(e) => {
                error!("❌ Job {}: failed after {:.1}s: {}", job_id, start_time.elapsed().as_secs_f64(), e);
                JobUpdate::Failed(e.to_string())
            }
        };

        // Cleanup happens before the terminal status becomes visible
        if let Err(e) = workspace.close() {
            warn!("Job {}: failed to remove workspace: {}", job_id, e);
        }

        self.store.update(&job_id, update).await
    }

    fn artifacts_dir(&self, spec: &JobSpec, workspace: &Workspace, options: &RunOptions) -> PathBuf {
        match (&options.artifacts_root, options.resumable) {
            (Some(root), true) => root.join(&spec.job_id),
            _ => workspace.path().to_path_buf(),
        }
    }

    /// True when the stage's artifact can stand in for running it
    async fn can_skip(&self, stage: Stage, artifacts: &ArtifactStore, spec: &JobSpec, options: &RunOptions) -> bool {
        let skip = options.resumable
            && !options.force.contains(&stage)
            && artifacts.exists(&stage.artifact_name(&spec.source_name)).await;
        if skip {
            info!("⏭️  Job {}: {} already done, skipping", spec.job_id, stage);
        }
        skip
    }

    async fn begin(&self, stage: Stage, job_id: &str) {
        if let Err(e) = self.store.update(job_id, JobUpdate::Step(stage.label())).await {
            warn!("Job {}: could not record step {}: {}", job_id, stage, e);
        }
    }

    async fn execute(&self, spec: JobSpec, workspace: &Workspace, options: &RunOptions) -> Result<LocalizationResult> {
        let artifacts = ArtifactStore::open(self.artifacts_dir(&spec, workspace, options)).await?;
        let work_dir = workspace.path();
        let services = &self.services;
        let settings = &self.settings;
        let mut ctx = JobContext::new(spec);
        let job_id = ctx.job_id().to_string();
        let source_name = ctx.spec.source_name.clone();

        // Upload
        let name = Stage::Upload.artifact_name(&source_name);
        if self.can_skip(Stage::Upload, &artifacts, &ctx.spec, options).await {
            ctx.media_locator = Some(artifacts.read_text(&name).await?.trim().to_string());
        } else {
            self.begin(Stage::Upload, &job_id).await;
            let locator = upload::upload_source(services.storage.as_ref(), &settings.retry, &ctx.spec).await?;
            artifacts.write_text(&name, &locator).await?;
            ctx.media_locator = Some(locator);
        }

        // Transcribe
        let name = Stage::Transcribe.artifact_name(&source_name);
        if self.can_skip(Stage::Transcribe, &artifacts, &ctx.spec, options).await {
            let text = artifacts.read_text(&name).await?;
            let language = if artifacts.exists(TRANSCRIPT_LANGUAGE_ARTIFACT).await {
                artifacts
                    .read_json::<DetectedLanguage>(TRANSCRIPT_LANGUAGE_ARTIFACT)
                    .await
                    .ok()
            } else {
                None
            };
            ctx.transcript = Some(Transcript::new(text).with_language(language));
        } else {
            self.begin(Stage::Transcribe, &job_id).await;
            let transcript = transcribe::transcribe(
                services.transcription.as_ref(),
                services.storage.as_ref(),
                settings,
                &job_id,
                ctx.media_locator()?,
                work_dir,
            )
            .await?;
            artifacts.write_text(&name, &transcript.text).await?;
            if let Some(language) = &transcript.language {
                artifacts.write_json(TRANSCRIPT_LANGUAGE_ARTIFACT, language).await?;
            }
            ctx.transcript = Some(transcript);
        }

        // Translate
        let name = Stage::Translate.artifact_name(&source_name);
        if self.can_skip(Stage::Translate, &artifacts, &ctx.spec, options).await {
            ctx.translation = Some(Translation {
                text: artifacts.read_text(&name).await?,
                target_lang: ctx.spec.target_lang.clone(),
            });
        } else {
            self.begin(Stage::Translate, &job_id).await;
            let translation = translate::translate(
                services.language_model.as_ref(),
                settings,
                &job_id,
                ctx.transcript()?,
                &ctx.spec.target_lang,
            )
            .await?;
            artifacts.write_text(&name, &translation.text).await?;
            ctx.translation = Some(translation);
        }

        // Analyze
        let name = Stage::Analyze.artifact_name(&source_name);
        let cached = if self.can_skip(Stage::Analyze, &artifacts, &ctx.spec, options).await {
            match artifacts.read_json::<QualityReport>(&name).await {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!("Job {}: cached analysis unreadable, running again: {}", job_id, e);
                    None
                }
            }
        } else {
            None
        };
        let report = match cached {
            Some(report) => report,
            None => {
                self.begin(Stage::Analyze, &job_id).await;
                let report = analyze::analyze(
                    services.language_model.as_ref(),
                    settings,
                    &job_id,
                    ctx.transcript()?,
                    ctx.translation()?,
                )
                .await;
                artifacts.write_json(&name, &report).await?;
                report
            }
        };
        ctx.quality_report = Some(report);

        // Synthesize
        let name = Stage::Synthesize.artifact_name(&source_name);
        if self.can_skip(Stage::Synthesize, &artifacts, &ctx.spec, options).await {
            ctx.audio_path = Some(artifacts.path(&name));
        } else {
            self.begin(Stage::Synthesize, &job_id).await;
            let audio_path = synthesize::synthesize(
                services.speech.as_ref(),
                settings,
                &job_id,
                ctx.translation()?,
                work_dir,
            )
            .await?;
            let audio_path = if options.resumable {
                artifacts.import(&name, &audio_path).await?
            } else {
                audio_path
            };
            ctx.audio_path = Some(audio_path);
        }

        // Merge
        let name = Stage::Merge.artifact_name(&source_name);
        if self.can_skip(Stage::Merge, &artifacts, &ctx.spec, options).await {
            ctx.localized_path = Some(artifacts.path(&name));
        } else {
            self.begin(Stage::Merge, &job_id).await;
            // A failed mux may leave a partial file; only a finished one
            // reaches the artifact directory.
            let output = merge::merge(
                services.muxer.as_ref(),
                settings,
                &ctx.spec.source_path,
                ctx.audio_path()?,
                &work_dir.join(&name),
            )
            .await?;
            let output = if options.resumable {
                artifacts.import(&name, &output).await?
            } else {
                output
            };
            ctx.localized_path = Some(output);
        }

        // Publish
        let name = Stage::Publish.artifact_name(&source_name);
        if self.can_skip(Stage::Publish, &artifacts, &ctx.spec, options).await {
            ctx.video_locator = Some(artifacts.read_text(&name).await?.trim().to_string());
        } else {
            self.begin(Stage::Publish, &job_id).await;
            let locator = publish::publish(
                services.storage.as_ref(),
                &settings.retry,
                &job_id,
                ctx.localized_path()?,
            )
            .await?;
            artifacts.write_text(&name, &locator).await?;
            ctx.video_locator = Some(locator);
        }

        ctx.into_result()
    }
}
