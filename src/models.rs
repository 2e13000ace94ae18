//! Artifacts produced by the pipeline stages

use serde::{Deserialize, Serialize};

/// Placeholder stored when the transcription service returns no speech
pub const NO_SPEECH_PLACEHOLDER: &str = "[No speech detected]";

/// Language identified by the transcription service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLanguage {
    pub code: String,
    pub score: Option<f64>,
}

impl DetectedLanguage {
    pub fn describe(&self) -> String {
        match self.score {
            Some(score) => format!("{} (confidence: {:.2})", self.code, score),
            None => self.code.clone(),
        }
    }
}

/// Text extracted from the source media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub language: Option<DetectedLanguage>,
}

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let text = if text.trim().is_empty() {
            NO_SPEECH_PLACEHOLDER.to_string()
        } else {
            text
        };
        Self { text, language: None }
    }

    pub fn with_language(mut self, language: Option<DetectedLanguage>) -> Self {
        self.language = language;
        self
    }
}

/// Transcript rendered in the target language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub text: String,
    pub target_lang: String,
}

/// Category of a suspected mistranslation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueCategory {
    #[serde(rename = "Idiom/Proverb")]
    IdiomProverb,
    #[serde(rename = "Colloquialism")]
    Colloquialism,
    #[serde(rename = "Cultural Reference")]
    CulturalReference,
    #[serde(rename = "Puns/Wordplay")]
    PunsWordplay,
}

/// Single phrase flagged by the quality analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Issue {
    pub original_phrase: String,
    pub translated_phrase: String,
    pub category: IssueCategory,
    pub explanation: String,
}

/// Linguistic quality report for a transcript/translation pair.
///
/// `error` is only set when the analysis degraded; the issue list is then
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub potential_issues: Vec<Issue>,
}

impl QualityReport {
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            potential_issues: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Final deliverable of a completed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizationResult {
    pub video_locator: String,
    pub transcript: String,
    pub translation: String,
    pub quality_report: QualityReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<DetectedLanguage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_transcript_gets_placeholder() {
        assert_eq!(Transcript::new("   ").text, NO_SPEECH_PLACEHOLDER);
        assert_eq!(Transcript::new("Hello world").text, "Hello world");
    }

    #[test]
    fn test_issue_category_names() {
        let json = serde_json::to_string(&IssueCategory::CulturalReference).unwrap();
        assert_eq!(json, "\"Cultural Reference\"");

        let parsed: IssueCategory = serde_json::from_str("\"Puns/Wordplay\"").unwrap();
        assert_eq!(parsed, IssueCategory::PunsWordplay);

        assert!(serde_json::from_str::<IssueCategory>("\"Slang\"").is_err());
    }

    #[test]
    fn test_clean_report_omits_error() {
        let json = serde_json::to_value(QualityReport::default()).unwrap();
        assert_eq!(json, serde_json::json!({"potential_issues": []}));

        let degraded = serde_json::to_value(QualityReport::degraded("boom")).unwrap();
        assert_eq!(degraded["error"], "boom");
    }
}
