//! External capability providers: OCR, speech-to-text and text generation.
//!
//! Each capability is an async trait so the ingestion pipeline and the
//! chat orchestrator can be driven by fakes in tests. Concrete backends:
//!
//! | Capability | Config value | Implementation |
//! |------------|--------------|----------------|
//! | OCR | `"google-vision"` | [`vision::GoogleVisionOcr`] |
//! | Speech | `"openai"` | [`openai::WhisperSpeech`] |
//! | Generation | `"openai"` | [`openai::OpenAiGeneration`] |
//! | any | `"disabled"` | [`DisabledProvider`] |
//!
//! Use [`create_ocr_provider`], [`create_speech_provider`] and
//! [`create_generation_provider`] to build the configured backend:
//!
//! ```rust
//! # use media_harness::config::ProvidersConfig;
//! # use media_harness::providers::create_generation_provider;
//! let config = ProvidersConfig::default(); // every provider "disabled"
//! let provider = create_generation_provider(&config).unwrap();
//! assert_eq!(provider.name(), "disabled");
//! ```
//!
//! Every provider call returns a typed [`ProviderError`]. Callers absorb it
//! at the smallest scope they can (frame, chunk, file).

pub mod openai;
pub mod vision;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProvidersConfig;

/// Failure of an external capability call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0} provider is disabled")]
    Disabled(&'static str),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection-level failure before any status was received.
    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A media subprocess (ffmpeg/ffprobe) failed or could not be spawned.
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Classify a reqwest failure, keeping timeouts distinguishable.
    pub fn from_request(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout)
        } else if let Some(status) = err.status() {
            ProviderError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ProviderError::Transport(err.to_string())
        }
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// One OCR token with its bounding polygon, in provider order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub text: String,
    /// Polygon vertices as `(x, y)` pixel coordinates.
    pub vertices: Vec<(i64, i64)>,
}

impl TextBlock {
    /// Top y of the first vertex, used for row grouping.
    pub fn top_y(&self) -> i64 {
        self.vertices.first().map(|(_, y)| *y).unwrap_or(0)
    }
}

/// Result of one OCR call. An empty `text` means nothing was detected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrResult {
    pub text: String,
    pub blocks: Vec<TextBlock>,
}

#[async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn detect_text(&self, image: &[u8]) -> Result<OcrResult, ProviderError>;
}

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Transcribe one audio payload that fits under the provider ceiling.
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Provider used for every capability configured as `"disabled"`.
pub struct DisabledProvider {
    capability: &'static str,
}

impl DisabledProvider {
    pub fn new(capability: &'static str) -> Self {
        Self { capability }
    }
}

#[async_trait]
impl OcrProvider for DisabledProvider {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn detect_text(&self, _image: &[u8]) -> Result<OcrResult, ProviderError> {
        Err(ProviderError::Disabled(self.capability))
    }
}

#[async_trait]
impl SpeechProvider for DisabledProvider {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn transcribe(&self, _audio: Vec<u8>, _filename: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Disabled(self.capability))
    }
}

#[async_trait]
impl GenerationProvider for DisabledProvider {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Disabled(self.capability))
    }
}

pub fn create_ocr_provider(config: &ProvidersConfig) -> Result<Arc<dyn OcrProvider>> {
    match config.ocr.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider::new("ocr"))),
        "google-vision" => Ok(Arc::new(vision::GoogleVisionOcr::new(config)?)),
        other => anyhow::bail!("Unknown OCR provider: {}", other),
    }
}

pub fn create_speech_provider(config: &ProvidersConfig) -> Result<Arc<dyn SpeechProvider>> {
    match config.speech.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider::new("speech"))),
        "openai" => Ok(Arc::new(openai::WhisperSpeech::new(config)?)),
        other => anyhow::bail!("Unknown speech provider: {}", other),
    }
}

pub fn create_generation_provider(
    config: &ProvidersConfig,
) -> Result<Arc<dyn GenerationProvider>> {
    match config.generation.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider::new("generation"))),
        "openai" => Ok(Arc::new(openai::OpenAiGeneration::new(config)?)),
        other => anyhow::bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_provider_fails_typed() {
        let provider = create_ocr_provider(&ProvidersConfig::default()).unwrap();
        let err = provider.detect_text(b"png").await.unwrap_err();
        assert!(matches!(err, ProviderError::Disabled("ocr")));
        assert_eq!(err.to_string(), "ocr provider is disabled");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = ProvidersConfig::default();
        config.speech = "azure".to_string();
        assert!(create_speech_provider(&config).is_err());
    }

    #[test]
    fn block_top_y_defaults_to_zero() {
        let block = TextBlock {
            text: "x".to_string(),
            vertices: vec![],
        };
        assert_eq!(block.top_y(), 0);
    }
}
