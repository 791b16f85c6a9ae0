//! Core data models used throughout Media Harness.
//!
//! These types represent the tenant-scoped documents that flow out of the
//! ingestion pipeline and into the scorer and grounding assembler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-modality metric map (dimensions, duration proxy, frame count, ...).
///
/// Persisted as a JSON string in [`Document::features_json`].
pub type Features = serde_json::Map<String, serde_json::Value>;

/// Feature key recording why an extraction was degraded.
pub const DEGRADED_FEATURE: &str = "degraded";

/// The modality of an ingested file.
///
/// Always derived from the file extension via
/// [`media_type_for_extension`](crate::classify::media_type_for_extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Text,
    Image,
    Audio,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Text => "text",
            MediaType::Image => "image",
            MediaType::Audio => "audio",
            MediaType::Video => "video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(MediaType::Text),
            "image" => Ok(MediaType::Image),
            "audio" => Ok(MediaType::Audio),
            "video" => Ok(MediaType::Video),
            other => Err(format!(
                "unknown media type '{}': expected text, image, audio or video",
                other
            )),
        }
    }
}

/// A normalized document persisted in a tenant partition.
///
/// Created by the document assembler and never mutated afterwards except
/// by a full-field overwrite through `Store::upsert_document`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque identifier, unique within the tenant.
    pub id: String,
    pub tenant_id: String,
    pub filename: String,
    /// Lower-cased file extension without the dot.
    pub file_type: String,
    pub media_type: MediaType,
    /// Raw or derived representation: text body, transcript block,
    /// key-frame listing or a `data:` URI for images.
    pub content: String,
    /// Plain-text derivative used for matching and grounding.
    pub extracted_text: String,
    /// JSON-encoded [`Features`].
    pub features_json: String,
    pub file_size_kb: u64,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

impl Document {
    /// Decode the feature blob. A corrupt blob decodes to an empty map.
    pub fn features(&self) -> Features {
        serde_json::from_str(&self.features_json).unwrap_or_default()
    }

    /// The degradation reason recorded at ingestion time, if any.
    pub fn degradation(&self) -> Option<String> {
        self.features()
            .get(DEGRADED_FEATURE)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    pub fn is_degraded(&self) -> bool {
        self.degradation().is_some()
    }
}

/// A tenant and the number of documents stored under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantSummary {
    pub tenant_id: String,
    pub document_count: u64,
}
