use tracing::{info, warn};

use crate::error::PipelineError;
use crate::models::{QualityReport, Transcript, Translation};
use crate::pipeline::retry::{with_retry, RetryError};
use crate::pipeline::PipelineSettings;
use crate::services::LanguageModel;

pub const ANALYSIS_PROMPT: &str = r#"You are an expert linguistic analyst. Your task is to compare an original text with its translation and identify phrases that may have been translated incorrectly, focusing on these categories: Idioms & Proverbs, Fixed Expressions / Colloquialisms, Cultural References, and Puns & Wordplay.

Return ONLY a single JSON object with one key, "potential_issues", which contains a list of objects. Each object in the list must have these fields:
- "original_phrase": The phrase from the original text.
- "translated_phrase": The corresponding phrase in the translated text.
- "category": One of "Idiom/Proverb", "Colloquialism", "Cultural Reference", or "Puns/Wordplay".
- "explanation": A brief explanation of why this might be a mistranslation.

If no issues are found, return an empty list for the "potential_issues" key. Do not add any text outside the JSON object.
Example of a valid response:
{"potential_issues": [{"original_phrase": "it's raining cats and dogs", "translated_phrase": "está lloviendo gatos y perros", "category": "Idiom/Proverb", "explanation": "This is a literal translation of an English idiom. A more natural translation would be 'está lloviendo a cántaros'."}]}"#;

pub fn analysis_input(original: &str, translated: &str) -> String {
    format!(
        "Original Text:\n---\n{}\n---\n\nTranslated Text:\n---\n{}\n---",
        original, translated
    )
}

/// Remove a surrounding ```json or ``` fence
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

pub fn parse_report(reply: &str) -> Result<QualityReport, PipelineError> {
    let report: QualityReport = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| PipelineError::malformed("quality analysis", e.to_string()))?;
    Ok(QualityReport {
        error: None,
        ..report
    })
}

/// Ask the model for likely mistranslations. Never fails: problems are
/// recorded in the report's `error` field.
pub async fn analyze(
    model: &dyn LanguageModel,
    settings: &PipelineSettings,
    job_id: &str,
    transcript: &Transcript,
    translation: &Translation,
) -> QualityReport {
    let user_text = analysis_input(&transcript.text, &translation.text);

    let outcome = match with_retry(&settings.retry, "Quality analysis", || {
        model.invoke(ANALYSIS_PROMPT, &user_text, &settings.inference)
    })
    .await
    {
        Ok(response) => parse_report(&response.content).map_err(|e| e.to_string()),
        Err(RetryError::Failed(e)) => Err(format!("{:#}", e)),
        Err(RetryError::TimedOut(elapsed)) => {
            Err(format!("Quality analysis timed out after {:?}", elapsed))
        }
    };

    match outcome {
        Ok(report) => {
            info!(
                "🔍 Job {}: analysis found {} potential issues",
                job_id,
                report.potential_issues.len()
            );
            report
        }
        Err(e) => {
            warn!("Job {}: translation analysis degraded: {}", job_id, e);
            QualityReport::degraded(e)
        }
    }
}
