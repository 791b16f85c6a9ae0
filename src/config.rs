//! Configuration parsing and validation.
//!
//! Media Harness is configured through a TOML file (default
//! `config/mh.toml`). Every section except `[db]` is optional and falls back
//! to the defaults below.
//!
//! ```toml
//! [db]
//! path = "./data/mh.sqlite"
//!
//! [ingest]
//! workers = 4
//! chunk_seconds = 300
//! frame_interval_secs = 5
//!
//! [retrieval]
//! top_k = 5
//!
//! [providers]
//! ocr = "google-vision"
//! speech = "openai"
//! generation = "openai"
//! timeout_secs = 60
//! tool_timeout_secs = 300
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Bounded worker pool size for files, audio chunks and video frames.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Audio files above this size are split before transcription.
    #[serde(default = "default_max_transcription_bytes")]
    pub max_transcription_bytes: u64,
    #[serde(default = "default_chunk_seconds")]
    pub chunk_seconds: u64,
    #[serde(default = "default_frame_interval_secs")]
    pub frame_interval_secs: u64,
    /// Hard ceiling for one file's whole extraction.
    #[serde(default = "default_file_timeout_secs")]
    pub file_timeout_secs: u64,
    /// Vertical distance (px) within which OCR tokens share a table row.
    #[serde(default = "default_table_row_threshold")]
    pub table_row_threshold: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_transcription_bytes: default_max_transcription_bytes(),
            chunk_seconds: default_chunk_seconds(),
            frame_interval_secs: default_frame_interval_secs(),
            file_timeout_secs: default_file_timeout_secs(),
            table_row_threshold: default_table_row_threshold(),
        }
    }
}

impl IngestConfig {
    pub fn file_timeout(&self) -> Duration {
        Duration::from_secs(self.file_timeout_secs)
    }
}

fn default_workers() -> usize {
    1
}
fn default_max_transcription_bytes() -> u64 {
    25 * 1024 * 1024
}
fn default_chunk_seconds() -> u64 {
    300
}
fn default_frame_interval_secs() -> u64 {
    5
}
fn default_file_timeout_secs() -> u64 {
    900
}
fn default_table_row_threshold() -> i64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Documents passed to the grounding block per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvidersConfig {
    /// `"google-vision"` or `"disabled"`.
    #[serde(default = "default_disabled")]
    pub ocr: String,
    /// `"openai"` or `"disabled"`.
    #[serde(default = "default_disabled")]
    pub speech: String,
    /// `"openai"` or `"disabled"`.
    #[serde(default = "default_disabled")]
    pub generation: String,
    /// Per-call timeout for every external request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: PathBuf,
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: PathBuf,
    /// Per-invocation timeout for ffmpeg/ffprobe. Demuxing a long video is
    /// slower than any HTTP call, so it has its own bound.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            ocr: default_disabled(),
            speech: default_disabled(),
            generation: default_disabled(),
            timeout_secs: default_timeout_secs(),
            generation_model: default_generation_model(),
            transcription_model: default_transcription_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

fn default_disabled() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_generation_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_transcription_model() -> String {
    "whisper-1".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}
fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}
fn default_tool_timeout_secs() -> u64 {
    300
}

impl Config {
    /// Defaults with every provider disabled, used by tests and by
    /// commands that run without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/mh.sqlite"),
            },
            ingest: IngestConfig::default(),
            retrieval: RetrievalConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.ingest.workers == 0 {
        bail!("ingest.workers must be >= 1");
    }
    if config.ingest.chunk_seconds == 0 {
        bail!("ingest.chunk_seconds must be > 0");
    }
    if config.ingest.frame_interval_secs == 0 {
        bail!("ingest.frame_interval_secs must be > 0");
    }
    if config.ingest.file_timeout_secs == 0 {
        bail!("ingest.file_timeout_secs must be > 0");
    }
    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }
    if config.providers.timeout_secs == 0 {
        bail!("providers.timeout_secs must be > 0");
    }
    if config.providers.tool_timeout_secs == 0 {
        bail!("providers.tool_timeout_secs must be > 0");
    }

    match config.providers.ocr.as_str() {
        "disabled" | "google-vision" => {}
        other => bail!(
            "Unknown OCR provider: '{}'. Must be disabled or google-vision.",
            other
        ),
    }
    match config.providers.speech.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown speech provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    match config.providers.generation.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_fills_defaults() {
        let config: Config = toml::from_str("[db]\npath = \"/tmp/x.sqlite\"\n").unwrap();
        validate(&config).unwrap();
        assert_eq!(config.ingest.chunk_seconds, 300);
        assert_eq!(config.ingest.frame_interval_secs, 5);
        assert_eq!(config.ingest.max_transcription_bytes, 25 * 1024 * 1024);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.providers.generation, "disabled");
        assert_eq!(config.providers.tool_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn zero_tool_timeout_rejected() {
        let config: Config =
            toml::from_str("[db]\npath = \"x\"\n[providers]\ntool_timeout_secs = 0\n").unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("providers.tool_timeout_secs"));
    }

    #[test]
    fn zero_workers_rejected() {
        let config: Config =
            toml::from_str("[db]\npath = \"x\"\n[ingest]\nworkers = 0\n").unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("ingest.workers"));
    }

    #[test]
    fn unknown_provider_rejected() {
        let config: Config =
            toml::from_str("[db]\npath = \"x\"\n[providers]\nocr = \"tesseract\"\n").unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("Unknown OCR provider"));
    }
}
