use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use super::adapter_failure;
use crate::error::{PipelineError, Result};
use crate::models::Translation;
use crate::pipeline::retry::with_retry;
use crate::pipeline::PipelineSettings;
use crate::services::SpeechSynthesizer;
use crate::voice::VoiceProfile;

/// Render the translation as speech into `<work_dir>/<uuid>.<format>`
pub async fn synthesize(
    speech: &dyn SpeechSynthesizer,
    settings: &PipelineSettings,
    job_id: &str,
    translation: &Translation,
    work_dir: &Path,
) -> Result<PathBuf> {
    let profile = VoiceProfile::for_language(&translation.target_lang);
    info!(
        "🔊 Job {}: using voice {} ({} engine) for {}",
        job_id, profile.voice_id, profile.engine, translation.target_lang
    );

    let audio = with_retry(&settings.retry, "Speech synthesis", || {
        speech.synthesize(
            &translation.text,
            profile.voice_id,
            profile.engine,
            &settings.speech_format,
        )
    })
    .await
    .map_err(|e| e.into_pipeline("Speech synthesis", |e| adapter_failure(e, PipelineError::Synthesis)))?;

    if audio.is_empty() {
        return Err(PipelineError::Synthesis("speech service returned no audio".to_string()));
    }

    let audio_path = work_dir.join(format!("{}.{}", Uuid::new_v4(), settings.speech_format));
    tokio::fs::write(&audio_path, &audio).await?;

    info!("✅ Job {}: wrote {} bytes of speech", job_id, audio.len());
    Ok(audio_path)
}
