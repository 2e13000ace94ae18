//! Voice selection for speech synthesis

use serde::{Deserialize, Serialize};
use std::fmt;

/// Synthesis engine class requested from the speech service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    Standard,
    Neural,
    Generative,
    LongForm,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Standard => "standard",
            Engine::Neural => "neural",
            Engine::Generative => "generative",
            Engine::LongForm => "long-form",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voice and engine used for one target language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoiceProfile {
    pub voice_id: &'static str,
    pub engine: Engine,
}

/// Language code to voice mapping. Codes are unique.
const VOICE_PROFILES: &[(&str, VoiceProfile)] = &[
    // Cantonese
    ("zh-HK", VoiceProfile { voice_id: "Hiujin", engine: Engine::Neural }),
    // Mandarin
    ("zh-CN", VoiceProfile { voice_id: "Zhiyu", engine: Engine::Neural }),
    ("zh", VoiceProfile { voice_id: "Zhiyu", engine: Engine::Neural }),
    ("en-US", VoiceProfile { voice_id: "Danielle", engine: Engine::Generative }),
    ("en", VoiceProfile { voice_id: "Danielle", engine: Engine::Generative }),
    ("es-US", VoiceProfile { voice_id: "Lupe", engine: Engine::Generative }),
    ("es", VoiceProfile { voice_id: "Lupe", engine: Engine::Generative }),
];

/// Language used when no profile matches the requested code
pub const DEFAULT_VOICE_LANGUAGE: &str = "en";

impl VoiceProfile {
    /// Exact-match lookup on the language code, falling back to English.
    pub fn for_language(lang: &str) -> VoiceProfile {
        Self::lookup(lang).unwrap_or_else(Self::default_profile)
    }

    /// Exact-match lookup without fallback
    pub fn lookup(lang: &str) -> Option<VoiceProfile> {
        VOICE_PROFILES
            .iter()
            .find(|(code, _)| *code == lang)
            .map(|(_, profile)| *profile)
    }

    pub fn default_profile() -> VoiceProfile {
        VOICE_PROFILES
            .iter()
            .find(|(code, _)| *code == DEFAULT_VOICE_LANGUAGE)
            .map(|(_, profile)| *profile)
            .unwrap_or(VoiceProfile {
                voice_id: "Danielle",
                engine: Engine::Generative,
            })
    }

    /// All language codes with a dedicated voice
    pub fn supported_languages() -> impl Iterator<Item = &'static str> {
        VOICE_PROFILES.iter().map(|(code, _)| *code)
    }
}
