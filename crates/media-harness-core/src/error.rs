//! Request-level error type.
//!
//! Extraction failures never appear here: they are absorbed into degraded
//! documents by the ingestion pipeline. What remains are the failures a
//! caller must see: bad input, a broken store, or a failed generation call.

/// Errors surfaced to the caller of an ingestion or chat request.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Missing tenant id, query or file. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// The document store failed. Propagated without retry.
    #[error("storage error: {0}")]
    Storage(String),

    /// The generation provider failed. Fatal for the chat request.
    #[error("generation failed: {0}")]
    Generation(String),
}

impl HarnessError {
    pub fn validation(msg: impl Into<String>) -> Self {
        HarnessError::Validation(msg.into())
    }

    /// Wrap a store failure, keeping the full context chain.
    pub fn storage(err: anyhow::Error) -> Self {
        HarnessError::Storage(format!("{:#}", err))
    }
}

/// Reject a blank tenant id.
pub fn require_tenant(tenant_id: &str) -> Result<&str, HarnessError> {
    let trimmed = tenant_id.trim();
    if trimmed.is_empty() {
        return Err(HarnessError::validation("tenant id is required"));
    }
    Ok(trimmed)
}
