use std::path::{Path, PathBuf};

use super::adapter_failure;
use crate::error::{PipelineError, Result};
use crate::media::MediaMuxer;
use crate::pipeline::retry::with_retry;
use crate::pipeline::PipelineSettings;

/// Replace the source audio track with the synthesized speech
pub async fn merge(
    muxer: &dyn MediaMuxer,
    settings: &PipelineSettings,
    video: &Path,
    audio: &Path,
    output: &Path,
) -> Result<PathBuf> {
    with_retry(&settings.retry, "Media merge", || muxer.replace_audio(video, audio, output))
        .await
        .map_err(|e| e.into_pipeline("Media merge", |e| adapter_failure(e, PipelineError::Merge)))
}
