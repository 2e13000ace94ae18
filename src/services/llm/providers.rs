use super::{ChatMessage, InferenceConfig, LLMProvider, LLMResponse, LanguageModel, DEFAULT_BEDROCK_ENDPOINT};
use crate::config::LLMConfig;
use crate::error::PipelineError;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_LMSTUDIO_ENDPOINT: &str = "http://localhost:1234/v1/chat/completions";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

fn build_client(config: &LLMConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?)
}

/// Read a successful response body into `T`, reporting undecodable bodies as
/// malformed responses.
async fn decode_response<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(anyhow!("{} API error {}: {}", service, status, text));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| PipelineError::malformed(service, e.to_string()).into())
}

/// Model hosted behind the messages-v1 invoke API
pub struct BedrockProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessagesV1Request {
    schema_version: &'static str,
    system: Vec<TextBlock>,
    messages: Vec<MessagesV1Message>,
    inference_config: MessagesV1Inference,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextBlock {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MessagesV1Message {
    role: String,
    content: Vec<TextBlock>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessagesV1Inference {
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct MessagesV1Response {
    output: MessagesV1Output,
    usage: Option<MessagesV1Usage>,
}

#[derive(Debug, Deserialize)]
struct MessagesV1Output {
    message: MessagesV1Message,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesV1Usage {
    total_tokens: u32,
}

impl BedrockProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn invoke_url(&self) -> String {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_BEDROCK_ENDPOINT)
            .trim_end_matches('/');
        format!("{}/model/{}/invoke", endpoint, self.config.model)
    }
}

#[async_trait]
impl LanguageModel for BedrockProvider {
    async fn invoke(&self, system: &str, user_text: &str, inference: &InferenceConfig) -> Result<LLMResponse> {
        let request = MessagesV1Request {
            schema_version: "messages-v1",
            system: vec![TextBlock {
                text: system.to_string(),
            }],
            messages: vec![MessagesV1Message {
                role: "user".to_string(),
                content: vec![TextBlock {
                    text: user_text.to_string(),
                }],
            }],
            inference_config: MessagesV1Inference {
                max_tokens: inference.max_tokens,
                temperature: inference.temperature,
                top_p: inference.top_p,
            },
        };

        let url = self.invoke_url();
        debug!("Invoking model {} at {}", self.config.model, url);

        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }
        let response = builder.send().await?;

        let decoded: MessagesV1Response = decode_response("Bedrock", response).await?;

        let content = decoded
            .output
            .message
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| PipelineError::malformed("Bedrock", "output.message.content is empty"))?;

        Ok(LLMResponse {
            content,
            tokens_used: decoded.usage.map(|u| u.total_tokens),
        })
    }

    /// The public endpoint needs a key; a custom endpoint is assumed to
    /// handle its own auth.
    async fn is_available(&self) -> bool {
        let custom_endpoint = self
            .config
            .endpoint
            .as_deref()
            .map_or(false, |endpoint| endpoint != DEFAULT_BEDROCK_ENDPOINT);
        self.config.api_key.is_some() || custom_endpoint
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Bedrock
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    total_tokens: u32,
}

/// Shared request path for OpenAI-compatible chat completion endpoints
#[allow(clippy::too_many_arguments)]
async fn chat_completion(
    service: &'static str,
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    model: &str,
    system: &str,
    user_text: &str,
    inference: &InferenceConfig,
) -> Result<LLMResponse> {
    let request = ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::system(system), ChatMessage::user(user_text)],
        max_tokens: inference.max_tokens,
        temperature: inference.temperature,
        top_p: inference.top_p,
    };

    debug!("Sending request to {} at {}", service, url);

    let mut builder = client.post(url).json(&request);
    if let Some(api_key) = api_key {
        builder = builder.header("Authorization", format!("Bearer {}", api_key));
    }
    let response = builder.send().await?;

    let decoded: ChatCompletionResponse = decode_response(service, response).await?;

    let content = decoded
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| PipelineError::malformed(service, "choices is empty"))?;

    Ok(LLMResponse {
        content,
        tokens_used: decoded.usage.map(|u| u.total_tokens),
    })
}

/// LMStudio provider implementation
pub struct LMStudioProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LMStudioProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> &str {
        self.config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_LMSTUDIO_ENDPOINT)
    }
}

#[async_trait]
impl LanguageModel for LMStudioProvider {
    async fn invoke(&self, system: &str, user_text: &str, inference: &InferenceConfig) -> Result<LLMResponse> {
        chat_completion(
            "LMStudio",
            &self.client,
            self.endpoint(),
            self.config.api_key.as_deref(),
            &self.config.model,
            system,
            user_text,
            inference,
        )
        .await
    }

    async fn is_available(&self) -> bool {
        // Try to reach the health endpoint
        let health_endpoint = self.endpoint().replace("/v1/chat/completions", "/health");

        match self.client.get(&health_endpoint).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::LMStudio
    }
}

/// OpenAI provider implementation
pub struct OpenAIProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("OpenAI API key required"));
        }

        let client = build_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LanguageModel for OpenAIProvider {
    async fn invoke(&self, system: &str, user_text: &str, inference: &InferenceConfig) -> Result<LLMResponse> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OpenAI API key not configured"))?;

        chat_completion(
            "OpenAI",
            &self.client,
            self.config.endpoint.as_deref().unwrap_or(OPENAI_ENDPOINT),
            Some(api_key),
            &self.config.model,
            system,
            user_text,
            inference,
        )
        .await
    }

    async fn is_available(&self) -> bool {
        if let Some(api_key) = &self.config.api_key {
            let url = "https://api.openai.com/v1/models";

            match self
                .client
                .get(url)
                .header("Authorization", format!("Bearer {}", api_key))
                .send()
                .await
            {
                Ok(response) => response.status().is_success(),
                Err(_) => false,
            }
        } else {
            false
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::OpenAI
    }
}

/// Gemini provider implementation
pub struct GeminiProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "totalTokenCount")]
    total_token_count: u32,
}

impl GeminiProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("Gemini API key required"));
        }

        let client = build_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LanguageModel for GeminiProvider {
    async fn invoke(&self, system: &str, user_text: &str, inference: &InferenceConfig) -> Result<LLMResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Gemini API key not configured"))?;

        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: user_text.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: inference.max_tokens,
                temperature: inference.temperature,
                top_p: inference.top_p,
            },
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.config.model, api_key
        );

        debug!("Sending request to Gemini API");

        let response = self.client.post(&url).json(&request).send().await?;

        let decoded: GeminiResponse = decode_response("Gemini", response).await?;

        let content = decoded
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| PipelineError::malformed("Gemini", "no candidate text"))?;

        Ok(LLMResponse {
            content,
            tokens_used: decoded.usage_metadata.map(|u| u.total_token_count),
        })
    }

    async fn is_available(&self) -> bool {
        // Simple check by trying to list models
        if let Some(api_key) = &self.config.api_key {
            let url = format!(
                "https://generativelanguage.googleapis.com/v1beta/models?key={}",
                api_key
            );

            match self.client.get(&url).send().await {
                Ok(response) => response.status().is_success(),
                Err(_) => false,
            }
        } else {
            false
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Gemini
    }
}
