//! Video extraction: demuxed-audio transcript plus OCR'd key frames.
//!
//! All intermediates (the demuxed WAV, sampled frames, audio chunks) live
//! in one `TempDir` per video and are removed when it drops.

use media_harness_core::Features;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::audio::transcribe_file;
use super::{Capabilities, Extraction, SourceFile};
use crate::config::IngestConfig;
use crate::pool::run_indexed;
use crate::providers::ProviderError;

pub const FRAME_NO_TEXT: &str = "No text detected in frame.";
pub const FRAME_FAILED: &str = "Error processing frame content.";
pub const VIDEO_FAILED: &str = "Error processing video content.";

/// Frames are scaled to this width before OCR.
const OCR_FRAME_WIDTH: u32 = 800;

/// The text recorded for one sampled frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameText {
    pub timestamp_secs: u64,
    pub text: String,
    /// Whether OCR failed and `text` is a fallback.
    pub fallback: bool,
}

impl FrameText {
    pub fn line(&self) -> String {
        format!("[{}s] {}", self.timestamp_secs, self.text)
    }
}

/// Build the stored video content block.
pub fn video_content(filename: &str, transcript: &str, frames: &[FrameText]) -> String {
    let lines = frames
        .iter()
        .map(FrameText::line)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "[Video: {}]\nTranscription: {}\nKey Frames:\n{}",
        filename, transcript, lines
    )
}

/// Extraction recorded when the video pipeline cannot run at all.
pub fn failed(source: &SourceFile) -> Extraction {
    let mut features = Features::new();
    features.insert("format".into(), source.extension.clone().into());
    features.insert("size".into(), source.size_kb().into());
    features.insert("error".into(), "Processing failed".into());
    Extraction {
        content: format!("[Video: {}]\n{}", source.filename, VIDEO_FAILED),
        extracted_text: String::new(),
        features,
        degradation: None,
    }
}

fn catastrophic(source: &SourceFile, step: &str, err: impl std::fmt::Display) -> Extraction {
    warn!(file = %source.filename, step, error = %err, "video processing failed");
    let mut extraction = failed(source);
    extraction.degrade(format!("{} failed: {}", step, err));
    extraction
}

/// Downscale a frame to [`OCR_FRAME_WIDTH`] as PNG. Undecodable frames are
/// passed through untouched.
fn prepare_frame(bytes: Vec<u8>) -> Vec<u8> {
    let img = match ::image::load_from_memory(&bytes) {
        Ok(img) => img,
        Err(_) => return bytes,
    };
    if img.width() <= OCR_FRAME_WIDTH {
        return bytes;
    }
    let height =
        ((img.height() as u64 * OCR_FRAME_WIDTH as u64) / img.width() as u64).max(1) as u32;
    let resized = img.resize_exact(
        OCR_FRAME_WIDTH,
        height,
        ::image::imageops::FilterType::Triangle,
    );
    let mut out = Vec::new();
    match resized.write_to(&mut Cursor::new(&mut out), ::image::ImageFormat::Png) {
        Ok(()) => out,
        Err(_) => bytes,
    }
}

async fn ocr_frame(caps: &Capabilities, path: &Path) -> (String, bool) {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(frame = %path.display(), error = %e, "frame unreadable");
            return (FRAME_FAILED.to_string(), true);
        }
    };

    // Fallback dimensions describe the frame OCR was given.
    let frame = prepare_frame(bytes);
    match caps.ocr.detect_text(&frame).await {
        Ok(result) => {
            let text = result.text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                (FRAME_NO_TEXT.to_string(), false)
            } else {
                (text, false)
            }
        }
        Err(e) => {
            debug!(frame = %path.display(), error = %e, "frame OCR failed, using dimensions");
            match caps.media.frame_dimensions(&frame) {
                Ok((w, h)) => (format!("Frame size: {}x{}", w, h), true),
                Err(_) => (FRAME_FAILED.to_string(), true),
            }
        }
    }
}

/// OCR every frame on the worker pool and return them in timestamp order.
pub async fn ocr_frames(
    frames: Vec<PathBuf>,
    interval_secs: u64,
    caps: &Capabilities,
    workers: usize,
) -> Vec<FrameText> {
    let results = run_indexed(frames.len(), workers, |i| {
        let caps = caps.clone();
        let path = frames[i].clone();
        async move { ocr_frame(&caps, &path).await }
    })
    .await;

    results
        .into_iter()
        .enumerate()
        .map(|(index, result)| {
            let (text, fallback) = result.unwrap_or_else(|| (FRAME_FAILED.to_string(), true));
            FrameText {
                timestamp_secs: index as u64 * interval_secs,
                text,
                fallback,
            }
        })
        .collect()
}

pub async fn extract_video(
    source: &SourceFile,
    caps: &Capabilities,
    settings: &IngestConfig,
) -> Extraction {
    let workdir = match tempfile::Builder::new().prefix("mh-video-").tempdir() {
        Ok(dir) => dir,
        Err(e) => return catastrophic(source, "temporary directory", e),
    };

    let audio_path = workdir.path().join("audio.wav");
    if let Err(e) = caps.media.demux_audio(&source.path, &audio_path).await {
        return catastrophic(source, "audio demux", e);
    }
    let audio_size = match tokio::fs::metadata(&audio_path).await {
        Ok(meta) => meta.len(),
        Err(e) => return catastrophic(source, "audio demux", ProviderError::Io(e)),
    };
    let transcript = transcribe_file(&audio_path, audio_size, "audio.wav", caps, settings).await;

    let frame_dir = workdir.path().join("frames");
    if let Err(e) = tokio::fs::create_dir(&frame_dir).await {
        return catastrophic(source, "frame sampling", e);
    }
    let frame_paths = match caps
        .media
        .sample_frames(&source.path, settings.frame_interval_secs, &frame_dir)
        .await
    {
        Ok(paths) => paths,
        Err(e) => return catastrophic(source, "frame sampling", e),
    };

    let frames = ocr_frames(frame_paths, settings.frame_interval_secs, caps, settings.workers).await;
    drop(workdir);

    let mut extraction = Extraction {
        content: video_content(&source.filename, &transcript.text, &frames),
        extracted_text: transcript.text.clone(),
        ..Default::default()
    };
    if let Some(reason) = transcript.degradation {
        extraction.degrade(reason);
    }
    let fallbacks = frames.iter().filter(|f| f.fallback).count();
    if fallbacks > 0 {
        extraction.degrade(format!("OCR failed for {} of {} frames", fallbacks, frames.len()));
    }

    let mut features = Features::new();
    features.insert("duration".into(), source.size_kb().into());
    features.insert("format".into(), source.extension.clone().into());
    features.insert("frame_count".into(), frames.len().into());
    features.insert("chunk_count".into(), transcript.chunk_count.into());
    extraction.features = features;
    extraction
}
