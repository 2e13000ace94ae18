use tracing::info;

use super::adapter_failure;
use crate::error::{PipelineError, Result};
use crate::models::{Transcript, Translation};
use crate::pipeline::retry::with_retry;
use crate::pipeline::PipelineSettings;
use crate::services::LanguageModel;

pub fn translation_prompt(target_lang: &str) -> String {
    format!(
        "You are an expert translator. Translate the following text to {}. \
         Your response should only contain the translated text, with no additional \
         explanations, introductions, or conversational text.",
        target_lang
    )
}

/// Translate the transcript. Any model failure or an empty reply is fatal.
pub async fn translate(
    model: &dyn LanguageModel,
    settings: &PipelineSettings,
    job_id: &str,
    transcript: &Transcript,
    target_lang: &str,
) -> Result<Translation> {
    let system = translation_prompt(target_lang);

    let response = with_retry(&settings.retry, "Translation", || {
        model.invoke(&system, &transcript.text, &settings.inference)
    })
    .await
    .map_err(|e| e.into_pipeline("Translation", |e| adapter_failure(e, PipelineError::Translation)))?;

    let text = response.content.trim().to_string();
    if text.is_empty() {
        return Err(PipelineError::Translation("model returned an empty translation".to_string()));
    }

    info!(
        "🌐 Job {}: translated {} chars to {} ({} tokens)",
        job_id,
        transcript.text.len(),
        target_lang,
        response
            .tokens_used
            .map_or_else(|| "?".to_string(), |t| t.to_string())
    );

    Ok(Translation {
        text,
        target_lang: target_lang.to_string(),
    })
}
