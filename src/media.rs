//! Media toolkit: duration probing, audio demux/slicing and frame sampling.
//!
//! The [`MediaToolkit`] trait is the seam between the audio/video
//! extractors and the `ffmpeg`/`ffprobe` binaries. Every output lands in a
//! caller-owned directory (a `tempfile::TempDir`), so cleanup follows the
//! directory's lifetime on every exit path.

use async_trait::async_trait;
use image::GenericImageView;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::providers::ProviderError;

#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Duration of an audio or video file in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64, ProviderError>;

    /// Extract the audio track as mono 16 kHz WAV.
    async fn demux_audio(&self, video: &Path, output: &Path) -> Result<(), ProviderError>;

    /// Cut `[start, start + duration)` seconds of `input` into `output`.
    async fn slice_audio(
        &self,
        input: &Path,
        start_secs: u64,
        duration_secs: f64,
        output: &Path,
    ) -> Result<(), ProviderError>;

    /// Sample one frame every `interval_secs` into `out_dir`.
    ///
    /// Returns frame image paths ordered by frame index.
    async fn sample_frames(
        &self,
        video: &Path,
        interval_secs: u64,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ProviderError>;

    /// Pixel dimensions of an encoded frame.
    fn frame_dimensions(&self, frame: &[u8]) -> Result<(u32, u32), ProviderError> {
        image::load_from_memory(frame)
            .map(|img| img.dimensions())
            .map_err(|e| ProviderError::InvalidResponse(format!("undecodable frame: {}", e)))
    }
}

/// [`MediaToolkit`] backed by `ffmpeg` and `ffprobe` subprocesses.
pub struct FfmpegToolkit {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
}

impl FfmpegToolkit {
    pub fn new(config: &Config) -> Self {
        Self {
            ffmpeg: config.providers.ffmpeg_path.clone(),
            ffprobe: config.providers.ffprobe_path.clone(),
            timeout: config.providers.tool_timeout(),
        }
    }

    async fn run(&self, program: &Path, args: &[&str]) -> Result<String, ProviderError> {
        let tool = program.display().to_string();
        debug!(tool = %tool, ?args, "spawning media tool");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
            .map_err(|e| ProviderError::tool(&tool, format!("failed to spawn: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::tool(
                &tool,
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn path_arg(path: &Path) -> Result<&str, ProviderError> {
    path.to_str()
        .ok_or_else(|| ProviderError::tool("ffmpeg", format!("non-UTF-8 path: {}", path.display())))
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe_duration(&self, path: &Path) -> Result<f64, ProviderError> {
        let stdout = self
            .run(
                &self.ffprobe,
                &[
                    "-v",
                    "error",
                    "-show_entries",
                    "format=duration",
                    "-of",
                    "default=noprint_wrappers=1:nokey=1",
                    path_arg(path)?,
                ],
            )
            .await?;
        parse_duration(&stdout)
    }

    async fn demux_audio(&self, video: &Path, output: &Path) -> Result<(), ProviderError> {
        self.run(
            &self.ffmpeg,
            &[
                "-y", "-v", "error", "-i", path_arg(video)?, "-vn", "-ac", "1", "-ar", "16000",
                "-f", "wav", path_arg(output)?,
            ],
        )
        .await?;
        Ok(())
    }

    async fn slice_audio(
        &self,
        input: &Path,
        start_secs: u64,
        duration_secs: f64,
        output: &Path,
    ) -> Result<(), ProviderError> {
        let start = start_secs.to_string();
        let duration = format!("{:.3}", duration_secs);
        self.run(
            &self.ffmpeg,
            &[
                "-y", "-v", "error", "-ss", &start, "-t", &duration, "-i", path_arg(input)?,
                "-ac", "1", "-ar", "16000", "-f", "wav", path_arg(output)?,
            ],
        )
        .await?;
        Ok(())
    }

    async fn sample_frames(
        &self,
        video: &Path,
        interval_secs: u64,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ProviderError> {
        let filter = format!("fps=1/{}", interval_secs);
        let pattern = out_dir.join("frame_%06d.png");
        self.run(
            &self.ffmpeg,
            &["-y", "-v", "error", "-i", path_arg(video)?, "-vf", &filter, path_arg(&pattern)?],
        )
        .await?;

        let mut frames: Vec<(u64, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(out_dir)? {
            let path = entry?.path();
            let index = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(frame_index);
            if let Some(index) = index {
                frames.push((index, path));
            }
        }
        frames.sort_by_key(|(index, _)| *index);
        Ok(frames.into_iter().map(|(_, path)| path).collect())
    }
}

/// Parse ffprobe's bare duration output.
pub fn parse_duration(stdout: &str) -> Result<f64, ProviderError> {
    let trimmed = stdout.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("unparseable duration: {:?}", trimmed)))
}

/// Numeric index of a `frame_<n>.png` file name.
pub fn frame_index(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix("frame_")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}
