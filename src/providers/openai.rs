//! OpenAI speech-to-text (`audio/transcriptions`) and chat completion clients.
//!
//! Both require `OPENAI_API_KEY`. Neither retries: a failed transcription
//! is absorbed per chunk by the caller, and a failed generation is fatal
//! for the chat request.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::{GenerationProvider, ProviderError, SpeechProvider};
use crate::config::ProvidersConfig;

const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

fn api_key() -> Result<String> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("OPENAI_API_KEY environment variable not set"),
    }
}

async fn read_json(
    response: reqwest::Response,
) -> Result<serde_json::Value, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Http {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

pub struct WhisperSpeech {
    client: reqwest::Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl WhisperSpeech {
    pub fn new(config: &ProvidersConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(config.timeout())
                .build()?,
            api_key: api_key()?,
            model: config.transcription_model.clone(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl SpeechProvider for WhisperSpeech {
    fn name(&self) -> &str {
        "openai"
    }

    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String, ProviderError> {
        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let response = self
            .client
            .post(TRANSCRIPTIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::from_request(e, self.timeout))?;

        let json = read_json(response).await?;
        parse_transcription(&json)
    }
}

pub fn parse_transcription(json: &serde_json::Value) -> Result<String, ProviderError> {
    json.get("text")
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| ProviderError::InvalidResponse("missing 'text' field".to_string()))
}

pub struct OpenAiGeneration {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiGeneration {
    pub fn new(config: &ProvidersConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(config.timeout())
                .build()?,
            api_key: api_key()?,
            model: config.generation_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiGeneration {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_request(e, self.timeout))?;

        let json = read_json(response).await?;
        parse_completion(&json)
    }
}

pub fn parse_completion(json: &serde_json::Value) -> Result<String, ProviderError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| {
            ProviderError::InvalidResponse("missing choices[0].message.content".to_string())
        })
}
