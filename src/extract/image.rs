//! Image extraction: OCR text, token positions, table rows and pixel stats.

use base64::Engine;
use media_harness_core::Features;
use tracing::warn;

use super::{Extraction, SourceFile};
use crate::providers::{OcrProvider, OcrResult, TextBlock};

pub const NO_TEXT: &str = "No text detected in the image.";
pub const OCR_FAILED: &str = "Error analyzing image content.";

/// Decoded image properties. Per-channel statistics follow the decoded
/// channel layout (1 to 4 channels).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStats {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub channel_means: Vec<f64>,
    pub channel_stdevs: Vec<f64>,
}

impl ImageStats {
    pub fn brightness(&self) -> f64 {
        self.channel_means.first().copied().unwrap_or(0.0)
    }

    pub fn contrast(&self) -> f64 {
        self.channel_stdevs.first().copied().unwrap_or(0.0)
    }
}

/// Decode `bytes` and compute dimensions and per-channel mean/stdev.
/// Returns `None` for undecodable data.
pub fn image_statistics(bytes: &[u8]) -> Option<ImageStats> {
    let format = ::image::guess_format(bytes).ok()?;
    let img = ::image::load_from_memory_with_format(bytes, format).ok()?;

    let channels = img.color().channel_count().clamp(1, 4) as usize;
    let raw = match channels {
        1 => img.to_luma8().into_raw(),
        2 => img.to_luma_alpha8().into_raw(),
        3 => img.to_rgb8().into_raw(),
        _ => img.to_rgba8().into_raw(),
    };

    let pixels = (raw.len() / channels).max(1) as f64;
    let mut sums = vec![0f64; channels];
    let mut squares = vec![0f64; channels];
    for pixel in raw.chunks_exact(channels) {
        for (c, value) in pixel.iter().enumerate() {
            let v = *value as f64;
            sums[c] += v;
            squares[c] += v * v;
        }
    }
    let channel_means: Vec<f64> = sums.iter().map(|s| s / pixels).collect();
    let channel_stdevs = squares
        .iter()
        .zip(&channel_means)
        .map(|(sq, mean)| (sq / pixels - mean * mean).max(0.0).sqrt())
        .collect();

    Some(ImageStats {
        width: img.width(),
        height: img.height(),
        format: format!("{:?}", format).to_lowercase(),
        channel_means,
        channel_stdevs,
    })
}

/// Group OCR tokens into rows by vertical proximity.
///
/// Tokens are sorted by top y (stable). A token within `threshold` px of
/// the current row's anchor joins it; otherwise it opens a new row
/// anchored at its own y. Only rows with more than one token are kept,
/// top to bottom.
pub fn reconstruct_table_rows(blocks: &[TextBlock], threshold: i64) -> Vec<Vec<String>> {
    let mut sorted: Vec<&TextBlock> = blocks.iter().collect();
    sorted.sort_by_key(|b| b.top_y());

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut anchor: Option<i64> = None;
    for block in sorted {
        let y = block.top_y();
        match anchor {
            Some(a) if (y - a).abs() <= threshold => {}
            _ => {
                rows.push(Vec::new());
                anchor = Some(y);
            }
        }
        if let Some(row) = rows.last_mut() {
            row.push(block.text.clone());
        }
    }

    rows.retain(|row| row.len() > 1);
    rows
}

/// Render an OCR result as the stored `extracted_text`.
pub fn describe_ocr(result: &OcrResult, threshold: i64) -> String {
    let mut lines = vec![
        "Full text:".to_string(),
        result.text.clone(),
        "\nText blocks:".to_string(),
    ];
    for block in &result.blocks {
        let location = block
            .vertices
            .iter()
            .map(|(x, y)| format!("({},{})", x, y))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("{} [at {}]", block.text, location));
    }
    let mut text = lines.join("\n");

    let rows = reconstruct_table_rows(&result.blocks, threshold);
    if !rows.is_empty() {
        let tables = rows
            .iter()
            .enumerate()
            .map(|(i, row)| format!("Table {}:\n{}", i + 1, row.join("\n")))
            .collect::<Vec<_>>()
            .join("\n\n");
        text.push_str("\n\nTables found:\n");
        text.push_str(&tables);
    }
    text
}

fn data_uri(bytes: &[u8], extension: &str) -> String {
    format!(
        "data:image/{};base64,{}",
        extension,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn base_features(stats: Option<&ImageStats>, source: &SourceFile) -> Features {
    let mut features = Features::new();
    if let Some(stats) = stats {
        features.insert("width".into(), stats.width.into());
        features.insert("height".into(), stats.height.into());
        features.insert("format".into(), stats.format.clone().into());
    } else {
        features.insert("format".into(), source.extension.clone().into());
    }
    features.insert("size".into(), source.size_kb().into());
    features
}

/// Placeholder extraction for an image whose processing never finished.
pub fn failed(source: &SourceFile) -> Extraction {
    Extraction {
        content: String::new(),
        extracted_text: OCR_FAILED.to_string(),
        features: base_features(None, source),
        degradation: None,
    }
}

pub async fn extract_image(
    bytes: &[u8],
    source: &SourceFile,
    ocr: &dyn OcrProvider,
    table_row_threshold: i64,
) -> Extraction {
    let stats = image_statistics(bytes);
    let mut features = base_features(stats.as_ref(), source);
    let mut extraction = Extraction {
        content: data_uri(bytes, &source.extension),
        ..Default::default()
    };

    match ocr.detect_text(bytes).await {
        Ok(result) => {
            if let Some(stats) = &stats {
                let colors: Vec<serde_json::Value> = stats
                    .channel_means
                    .iter()
                    .map(|m| m.round().into())
                    .collect();
                features.insert("colors".into(), colors.into());
                features.insert("brightness".into(), stats.brightness().round().into());
                features.insert("contrast".into(), stats.contrast().round().into());
            }
            if result.text.trim().is_empty() && result.blocks.is_empty() {
                extraction.extracted_text = NO_TEXT.to_string();
            } else {
                let table_count = reconstruct_table_rows(&result.blocks, table_row_threshold).len();
                features.insert("has_tables".into(), (table_count > 0).into());
                features.insert("table_count".into(), table_count.into());
                extraction.extracted_text = describe_ocr(&result, table_row_threshold);
            }
        }
        Err(e) => {
            warn!(file = %source.filename, provider = ocr.name(), error = %e, "image OCR failed");
            extraction.extracted_text = OCR_FAILED.to_string();
            extraction.degrade(format!("ocr failed: {}", e));
        }
    }

    extraction.features = features;
    extraction
}
