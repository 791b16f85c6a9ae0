//! Normalize an [`Extraction`] into a stored [`Document`].

use chrono::Utc;
use media_harness_core::models::DEGRADED_FEATURE;
use media_harness_core::{Document, MediaType};
use uuid::Uuid;

use crate::extract::{Extraction, SourceFile};

/// Stamp id, tenant, size and creation time onto an extraction.
///
/// `explicit_id` re-submits an existing document; otherwise a fresh UUID
/// is minted. A degradation reason is kept in the features under
/// [`DEGRADED_FEATURE`].
pub fn assemble_document(
    tenant_id: &str,
    explicit_id: Option<&str>,
    source: &SourceFile,
    media_type: MediaType,
    extraction: Extraction,
) -> Document {
    let mut features = extraction.features;
    if let Some(reason) = &extraction.degradation {
        features.insert(DEGRADED_FEATURE.into(), reason.clone().into());
    }
    let features_json = serde_json::Value::Object(features).to_string();

    Document {
        id: explicit_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        tenant_id: tenant_id.to_string(),
        filename: source.filename.clone(),
        file_type: source.extension.clone(),
        media_type,
        content: extraction.content,
        extracted_text: extraction.extracted_text,
        features_json,
        file_size_kb: source.size_kb(),
        created_at: Utc::now().timestamp(),
    }
}
