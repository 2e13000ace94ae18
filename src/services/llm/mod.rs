pub mod providers;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LLMConfig;

pub const DEFAULT_BEDROCK_ENDPOINT: &str = "https://bedrock-runtime.us-east-1.amazonaws.com";

/// LLM provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProvider {
    /// Hosted model invoked with the messages-v1 schema
    Bedrock,
    LMStudio,
    Gemini,
    OpenAI,
}

/// Sampling parameters for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.1,
            top_p: 0.9,
        }
    }
}

impl From<&LLMConfig> for InferenceConfig {
    fn from(config: &LLMConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }
}

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Language model used for translation and quality analysis.
///
/// A reply that cannot be decoded is reported as a
/// [`crate::error::PipelineError::MalformedResponse`] wrapped in the
/// returned `anyhow::Error`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn invoke(&self, system: &str, user_text: &str, inference: &InferenceConfig) -> Result<LLMResponse>;
    async fn is_available(&self) -> bool;
    fn provider_type(&self) -> LLMProvider;
}

/// Create LLM instance based on configuration
pub fn create_language_model(config: &LLMConfig) -> Result<Box<dyn LanguageModel>> {
    match config.provider {
        LLMProvider::Bedrock => Ok(Box::new(providers::BedrockProvider::new(config.clone())?)),
        LLMProvider::LMStudio => Ok(Box::new(providers::LMStudioProvider::new(config.clone())?)),
        LLMProvider::Gemini => Ok(Box::new(providers::GeminiProvider::new(config.clone())?)),
        LLMProvider::OpenAI => Ok(Box::new(providers::OpenAIProvider::new(config.clone())?)),
    }
}
