//! Speech synthesis adapter

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::voice::Engine;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` with the given voice and return the encoded audio
    async fn synthesize(&self, text: &str, voice_id: &str, engine: Engine, output_format: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    engine: Engine,
    output_format: &'a str,
}

/// HTTP speech client returning the audio body as a byte stream
pub struct HttpSpeechSynthesizer {
    config: SpeechConfig,
    client: reqwest::Client,
}

impl HttpSpeechSynthesizer {
    pub fn new(config: SpeechConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str, engine: Engine, output_format: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v1/speech", self.config.endpoint.trim_end_matches('/'));
        let request = SynthesizeRequest {
            text,
            voice_id,
            engine,
            output_format,
        };

        debug!("🔊 Requesting speech with voice {} ({})", voice_id, engine);

        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Speech API error {}: {}", status, text));
        }

        let mut audio = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk?);
        }

        debug!("Received {} bytes of audio", audio.len());
        Ok(audio)
    }
}
