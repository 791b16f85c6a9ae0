//! Audio transcription with chunking for files above the provider ceiling.
//!
//! Small files go to the speech provider in one call. Larger files are
//! probed for duration, cut into fixed-length chunks inside a temporary
//! directory and transcribed independently. A failed chunk is replaced by
//! [`CHUNK_FAILED`] in its own slot, so the transcript keeps chronological
//! order whatever the completion order was.

use media_harness_core::Features;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{Capabilities, Extraction, SourceFile};
use crate::config::IngestConfig;
use crate::pool::run_indexed;
use crate::providers::ProviderError;

pub const CHUNK_FAILED: &str = "[Error transcribing this segment]";
pub const TRANSCRIPTION_FAILED: &str = "Error transcribing audio content.";

/// One slice of a long recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkPlan {
    pub index: usize,
    pub start_secs: u64,
    pub duration_secs: f64,
}

/// Split `duration` seconds into `ceil(duration / chunk_secs)` sequential
/// chunks; the last one is cut to the remaining time.
pub fn plan_chunks(duration: f64, chunk_secs: u64) -> Vec<ChunkPlan> {
    if duration.is_nan() || duration <= 0.0 || chunk_secs == 0 {
        return Vec::new();
    }
    let count = (duration / chunk_secs as f64).ceil() as usize;
    (0..count)
        .map(|index| {
            let start_secs = index as u64 * chunk_secs;
            ChunkPlan {
                index,
                start_secs,
                duration_secs: (duration - start_secs as f64).min(chunk_secs as f64),
            }
        })
        .collect()
}

/// A transcript plus what happened while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// 1 for a single-call transcription, else the number of chunks.
    pub chunk_count: usize,
    pub degradation: Option<String>,
}

impl Transcript {
    fn failed(reason: String) -> Self {
        Self {
            text: TRANSCRIPTION_FAILED.to_string(),
            chunk_count: 0,
            degradation: Some(reason),
        }
    }
}

/// Transcribe the audio file at `path` (`size_bytes` long).
///
/// Never fails: provider and toolkit errors become placeholder text and a
/// degradation reason.
pub async fn transcribe_file(
    path: &Path,
    size_bytes: u64,
    upload_name: &str,
    caps: &Capabilities,
    settings: &IngestConfig,
) -> Transcript {
    if size_bytes <= settings.max_transcription_bytes {
        let result = match tokio::fs::read(path).await {
            Ok(bytes) => caps.speech.transcribe(bytes, upload_name).await,
            Err(e) => Err(ProviderError::Io(e)),
        };
        return match result {
            Ok(text) => Transcript {
                text,
                chunk_count: 1,
                degradation: None,
            },
            Err(e) => {
                warn!(file = %upload_name, error = %e, "transcription failed");
                Transcript::failed(format!("transcription failed: {}", e))
            }
        };
    }

    info!(
        file = %upload_name,
        size_bytes,
        limit = settings.max_transcription_bytes,
        "audio above transcription ceiling, splitting into chunks"
    );

    let duration = match caps.media.probe_duration(path).await {
        Ok(d) => d,
        Err(e) => {
            warn!(file = %upload_name, error = %e, "duration probe failed");
            return Transcript::failed(format!("duration probe failed: {}", e));
        }
    };

    let workdir = match tempfile::Builder::new().prefix("mh-chunks-").tempdir() {
        Ok(dir) => dir,
        Err(e) => return Transcript::failed(format!("temporary directory: {}", e)),
    };

    let plan = plan_chunks(duration, settings.chunk_seconds);
    let input = path.to_path_buf();
    let dir = workdir.path().to_path_buf();
    let label = upload_name.to_string();

    let results = run_indexed(plan.len(), settings.workers, |i| {
        let chunk = plan[i];
        let caps = caps.clone();
        let input = input.clone();
        let output = dir.join(format!("chunk_{:04}.wav", chunk.index));
        let label = label.clone();
        async move {
            match transcribe_chunk(&caps, &input, chunk, &output).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(file = %label, chunk = chunk.index, error = %e, "chunk transcription failed");
                    None
                }
            }
        }
    })
    .await;

    // Join points are done; removing the directory now is safe.
    drop(workdir);

    let failed = results.iter().filter(|r| !matches!(r, Some(Some(_)))).count();
    let text = results
        .into_iter()
        .map(|r| r.flatten().unwrap_or_else(|| CHUNK_FAILED.to_string()))
        .collect::<Vec<_>>()
        .join("\n");

    debug!(file = %upload_name, chunks = plan.len(), failed, "chunked transcription done");
    Transcript {
        text,
        chunk_count: plan.len(),
        degradation: (failed > 0)
            .then(|| format!("{} of {} audio chunks failed", failed, plan.len())),
    }
}

async fn transcribe_chunk(
    caps: &Capabilities,
    input: &Path,
    chunk: ChunkPlan,
    output: &Path,
) -> Result<String, ProviderError> {
    caps.media
        .slice_audio(input, chunk.start_secs, chunk.duration_secs, output)
        .await?;
    let bytes = tokio::fs::read(output).await?;
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chunk.wav".to_string());
    let text = caps.speech.transcribe(bytes, &name).await;
    // Best effort; the directory goes away with its TempDir regardless.
    let _ = tokio::fs::remove_file(output).await;
    text
}

fn features(source: &SourceFile, chunk_count: Option<usize>) -> Features {
    let mut features = Features::new();
    // Size proxy, kept under the historical "duration" key.
    features.insert("duration".into(), source.size_kb().into());
    features.insert("format".into(), source.extension.clone().into());
    if let Some(count) = chunk_count {
        features.insert("chunk_count".into(), count.into());
    }
    features
}

fn audio_content(filename: &str, transcript: &str) -> String {
    format!("[Audio: {}]\nTranscription: {}", filename, transcript)
}

/// Placeholder extraction for audio whose processing never finished.
pub fn failed(source: &SourceFile) -> Extraction {
    Extraction {
        content: audio_content(&source.filename, TRANSCRIPTION_FAILED),
        extracted_text: TRANSCRIPTION_FAILED.to_string(),
        features: features(source, None),
        degradation: None,
    }
}

pub async fn extract_audio(
    source: &SourceFile,
    caps: &Capabilities,
    settings: &IngestConfig,
) -> Extraction {
    let transcript =
        transcribe_file(&source.path, source.size_bytes, &source.filename, caps, settings).await;

    Extraction {
        content: audio_content(&source.filename, &transcript.text),
        features: features(source, Some(transcript.chunk_count)),
        extracted_text: transcript.text,
        degradation: transcript.degradation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_is_ceiling_of_duration() {
        assert_eq!(plan_chunks(600.0, 300).len(), 2);
        assert_eq!(plan_chunks(601.0, 300).len(), 3);
        assert_eq!(plan_chunks(1.0, 300).len(), 1);
        assert!(plan_chunks(0.0, 300).is_empty());
        assert!(plan_chunks(f64::NAN, 300).is_empty());
    }

    #[test]
    fn last_chunk_is_truncated() {
        let plan = plan_chunks(750.5, 300);
        assert_eq!(plan.len(), 3);
        assert_eq!(
            plan[0],
            ChunkPlan {
                index: 0,
                start_secs: 0,
                duration_secs: 300.0
            }
        );
        assert_eq!(plan[1].start_secs, 300);
        assert_eq!(plan[2].start_secs, 600);
        assert!((plan[2].duration_secs - 150.5).abs() < 1e-9);
    }

    #[test]
    fn audio_content_shape() {
        assert_eq!(
            audio_content("talk.mp3", "hello"),
            "[Audio: talk.mp3]\nTranscription: hello"
        );
    }
}
