//! Pipeline stages and their persisted artifacts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Processing stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Source media copied to object storage
    Upload,

    /// Speech extracted by the transcription service
    Transcribe,

    /// Transcript rendered in the target language
    Translate,

    /// Translation checked for idioms and cultural references
    Analyze,

    /// Translated text rendered as speech
    Synthesize,

    /// Synthesized speech muxed into the source video
    Merge,

    /// Localized video copied to object storage
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Upload,
        Stage::Transcribe,
        Stage::Translate,
        Stage::Analyze,
        Stage::Synthesize,
        Stage::Merge,
        Stage::Publish,
    ];

    /// One-based position in the pipeline
    pub fn position(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).map_or(0, |i| i + 1)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Transcribe => "transcribe",
            Stage::Translate => "translate",
            Stage::Analyze => "analyze",
            Stage::Synthesize => "synthesize",
            Stage::Merge => "merge",
            Stage::Publish => "publish",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Stage::Upload => "Uploading video",
            Stage::Transcribe => "Transcribing video",
            Stage::Translate => "Translating text",
            Stage::Analyze => "Analyzing translation quality",
            Stage::Synthesize => "Synthesizing speech",
            Stage::Merge => "Merging audio and video",
            Stage::Publish => "Uploading final video",
        }
    }

    /// Progress label stored on the job record, e.g. `"3/7: Translating text"`
    pub fn label(&self) -> String {
        format!("{}/{}: {}", self.position(), Self::ALL.len(), self.description())
    }

    /// File name of the artifact whose presence marks this stage done
    pub fn artifact_name(&self, source_name: &str) -> String {
        match self {
            Stage::Upload => "media_locator.txt".to_string(),
            Stage::Transcribe => "transcript.txt".to_string(),
            Stage::Translate => "translated.txt".to_string(),
            Stage::Analyze => "translation_analysis.json".to_string(),
            Stage::Synthesize => "synthesized_audio.mp3".to_string(),
            Stage::Merge => format!("localized_{}", source_name),
            Stage::Publish => "video_locator.txt".to_string(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.name() == wanted)
            .ok_or_else(|| format!("Unknown stage: {}", s))
    }
}

/// Companion artifact holding the detected source language
pub const TRANSCRIPT_LANGUAGE_ARTIFACT: &str = "transcript_language.json";
