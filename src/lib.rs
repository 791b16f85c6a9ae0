//! # Media Harness
//!
//! Multimodal ingestion and grounded question answering over tenant-scoped
//! document sets.
//!
//! Files of four modalities (text, image, audio, video) are normalized into
//! text-bearing documents through external OCR and speech-to-text providers,
//! stored per tenant in SQLite, ranked by keyword overlap and handed to a
//! text-generation provider as grounding context.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐   ┌──────────┐
//! │   Files    │──▶│ Extract+Assemble │──▶│  SQLite  │
//! │ txt/img/av │   │  OCR / Whisper   │   │ per-tenant│
//! └────────────┘   └──────────────────┘   └────┬─────┘
//!                                              │
//!                        ┌─────────────────────┤
//!                        ▼                     ▼
//!                  ┌───────────┐        ┌────────────┐
//!                  │  search   │───────▶│ ask (chat) │
//!                  └───────────┘        └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mh init
//! mh tenants create --name research
//! mh ingest --tenant research-1a2b3c4d ./media
//! mh ask --tenant research-1a2b3c4d "What was said about the budget?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`providers`] | OCR, speech and generation providers |
//! | [`media`] | ffmpeg/ffprobe toolkit |
//! | [`extract`] | Per-modality extraction |
//! | [`assemble`] | Extraction → document |
//! | [`ingest`] | Ingestion pipeline and `mh ingest` |
//! | [`search`] | `mh search` |
//! | [`chat`] | Chat orchestration and `mh ask` |
//! | [`tenants`] | Tenant administration |
//! | [`pool`] | Bounded worker pool |
//!
//! The document model, classifier, scorer and grounding assembler live in
//! the runtime-free [`media_harness_core`] crate.

pub mod assemble;
pub mod chat;
pub mod config;
pub mod db;
pub mod extract;
pub mod ingest;
pub mod media;
pub mod migrate;
pub mod pool;
pub mod providers;
pub mod search;
pub mod sqlite_store;
pub mod tenants;

pub use media_harness_core;
