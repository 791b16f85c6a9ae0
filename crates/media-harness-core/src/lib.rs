//! # Media Harness Core
//!
//! Shared, runtime-agnostic logic for Media Harness: the document model,
//! media classification, the store abstraction, the keyword-overlap scorer
//! and grounding-context assembly.
//!
//! This crate contains no tokio, sqlx, subprocess or filesystem code.
//! Capability providers (OCR, speech-to-text, generation) and the SQLite
//! store live in the `media-harness` app crate.

pub mod classify;
pub mod error;
pub mod grounding;
pub mod models;
pub mod search;
pub mod store;

pub use error::HarnessError;
pub use models::{Document, Features, MediaType, TenantSummary};
