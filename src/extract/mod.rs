//! Per-modality content extraction.
//!
//! [`extract`] dispatches on [`MediaType`] to one handler per modality:
//!
//! | Media type | Handler | Capabilities used |
//! |------------|---------|-------------------|
//! | `text` | [`text::extract_text`] | none |
//! | `image` | [`image::extract_image`] | OCR |
//! | `audio` | [`audio::extract_audio`] | speech, media toolkit |
//! | `video` | [`video::extract_video`] | speech, OCR, media toolkit |
//!
//! Handlers never return provider failures. A failed capability call is
//! replaced by placeholder text in the output and recorded in
//! [`Extraction::degradation`]. The only error left is an unreadable
//! source file.

pub mod audio;
pub mod image;
pub mod text;
pub mod video;

use anyhow::{Context, Result};
use media_harness_core::{Features, MediaType};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, IngestConfig};
use crate::media::{FfmpegToolkit, MediaToolkit};
use crate::providers::{create_ocr_provider, create_speech_provider, OcrProvider, SpeechProvider};

/// The external capabilities an extraction may call.
#[derive(Clone)]
pub struct Capabilities {
    pub ocr: Arc<dyn OcrProvider>,
    pub speech: Arc<dyn SpeechProvider>,
    pub media: Arc<dyn MediaToolkit>,
}

impl Capabilities {
    /// Build the configured OCR and speech backends plus the ffmpeg toolkit.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            ocr: create_ocr_provider(&config.providers)?,
            speech: create_speech_provider(&config.providers)?,
            media: Arc::new(FfmpegToolkit::new(config)),
        })
    }
}

/// A file on disk, described the way the extractors need it.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub filename: String,
    /// Normalized extension without the dot.
    pub extension: String,
    pub size_bytes: u64,
}

impl SourceFile {
    /// Size in KiB, rounded to nearest.
    pub fn size_kb(&self) -> u64 {
        (self.size_bytes + 512) / 1024
    }
}

/// Output of one extractor, before the document is assembled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub content: String,
    pub extracted_text: String,
    pub features: Features,
    /// Why part of the extraction fell back to placeholder text.
    pub degradation: Option<String>,
}

impl Extraction {
    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }

    /// Record an additional degradation reason.
    pub fn degrade(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.degradation = Some(match self.degradation.take() {
            Some(existing) => format!("{}; {}", existing, reason),
            None => reason,
        });
    }
}

/// Run the handler for `media_type` over `source`.
pub async fn extract(
    source: &SourceFile,
    media_type: MediaType,
    caps: &Capabilities,
    settings: &IngestConfig,
) -> Result<Extraction> {
    match media_type {
        MediaType::Text => {
            let bytes = read_source(source).await?;
            Ok(text::extract_text(&bytes, source))
        }
        MediaType::Image => {
            let bytes = read_source(source).await?;
            let threshold = settings.table_row_threshold;
            Ok(image::extract_image(&bytes, source, caps.ocr.as_ref(), threshold).await)
        }
        MediaType::Audio => Ok(audio::extract_audio(source, caps, settings).await),
        MediaType::Video => Ok(video::extract_video(source, caps, settings).await),
    }
}

/// The degraded extraction recorded when a file exceeds its time budget.
pub fn timed_out(source: &SourceFile, media_type: MediaType, limit: Duration) -> Extraction {
    let mut extraction = match media_type {
        MediaType::Text => {
            let mut features = Features::new();
            features.insert("size".into(), source.size_kb().into());
            features.insert("format".into(), source.extension.clone().into());
            Extraction {
                features,
                ..Default::default()
            }
        }
        MediaType::Image => image::failed(source),
        MediaType::Audio => audio::failed(source),
        MediaType::Video => video::failed(source),
    };
    extraction.degrade(format!("extraction timed out after {}s", limit.as_secs()));
    extraction
}

async fn read_source(source: &SourceFile) -> Result<Vec<u8>> {
    tokio::fs::read(&source.path)
        .await
        .with_context(|| format!("Failed to read {}", source.path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degradation_reasons_accumulate() {
        let mut extraction = Extraction::default();
        assert!(!extraction.is_degraded());
        extraction.degrade("ocr failed");
        extraction.degrade("1 of 3 audio chunks failed");
        assert_eq!(
            extraction.degradation.as_deref(),
            Some("ocr failed; 1 of 3 audio chunks failed")
        );
    }

    #[test]
    fn size_rounds_to_nearest_kib() {
        let mut source = SourceFile {
            path: PathBuf::from("a.txt"),
            filename: "a.txt".to_string(),
            extension: "txt".to_string(),
            size_bytes: 1536,
        };
        assert_eq!(source.size_kb(), 2);
        source.size_bytes = 1500;
        assert_eq!(source.size_kb(), 1);
        source.size_bytes = 0;
        assert_eq!(source.size_kb(), 0);
    }
}
