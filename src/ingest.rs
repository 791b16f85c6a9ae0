//! Ingestion pipeline orchestration.
//!
//! Coordinates the per-file flow: classify → extract → assemble → upsert.
//! Files in a batch run on the bounded worker pool (`ingest.workers`) and
//! each file runs under `ingest.file_timeout_secs`. One file's failure
//! never aborts the batch; only validation and storage errors reach the
//! caller.

use anyhow::{bail, Result};
use media_harness_core::classify::{extension_of, media_type_for_extension, normalize_extension};
use media_harness_core::error::require_tenant;
use media_harness_core::store::Store;
use media_harness_core::{Document, HarnessError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::assemble::assemble_document;
use crate::config::{Config, IngestConfig};
use crate::db;
use crate::extract::{self, Capabilities, SourceFile};
use crate::pool::run_indexed;
use crate::sqlite_store::SqliteStore;

/// One file to ingest into one tenant.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub tenant_id: String,
    pub path: PathBuf,
    /// Stored filename; defaults to the path's file name.
    pub filename: Option<String>,
    /// Declared extension; inferred from the filename when absent.
    pub extension: Option<String>,
    /// Re-submit under an existing id instead of minting one.
    pub explicit_id: Option<String>,
}

impl IngestRequest {
    pub fn new(tenant_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            path: path.into(),
            filename: None,
            extension: None,
            explicit_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.explicit_id = Some(id.into());
        self
    }
}

/// Result of ingesting one file.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Ingested(Document),
    /// Stored, but part of the extraction fell back to placeholder text.
    Degraded { document: Document, reason: String },
    /// Nothing stored (unreadable source).
    Failed { path: PathBuf, error: String },
}

impl IngestOutcome {
    pub fn document(&self) -> Option<&Document> {
        match self {
            IngestOutcome::Ingested(doc) | IngestOutcome::Degraded { document: doc, .. } => {
                Some(doc)
            }
            IngestOutcome::Failed { .. } => None,
        }
    }
}

/// Counts printed after a batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub ingested: usize,
    pub degraded: usize,
    pub failed: usize,
}

impl IngestSummary {
    pub fn from_outcomes(outcomes: &[IngestOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                IngestOutcome::Ingested(_) => summary.ingested += 1,
                IngestOutcome::Degraded { .. } => summary.degraded += 1,
                IngestOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

/// The ingestion pipeline: capabilities in, documents into the store.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn Store>,
    caps: Capabilities,
    settings: IngestConfig,
}

impl Ingestor {
    pub fn new(store: Arc<dyn Store>, caps: Capabilities, settings: IngestConfig) -> Self {
        Self {
            store,
            caps,
            settings,
        }
    }

    /// Ingest one file.
    pub async fn ingest_file(&self, request: IngestRequest) -> Result<IngestOutcome, HarnessError> {
        let tenant_id = require_tenant(&request.tenant_id)?.to_string();
        if request.path.as_os_str().is_empty() {
            return Err(HarnessError::validation("file is required"));
        }

        let source = match describe_source(&request).await {
            Ok(source) => source,
            Err(e) => {
                warn!(tenant = %tenant_id, file = %request.path.display(), error = %e, "cannot read source");
                return Ok(IngestOutcome::Failed {
                    path: request.path,
                    error: format!("{:#}", e),
                });
            }
        };
        let media_type = media_type_for_extension(&source.extension);
        info!(tenant = %tenant_id, file = %source.filename, media_type = %media_type, "ingesting");

        let limit = self.settings.file_timeout();
        let run = extract::extract(&source, media_type, &self.caps, &self.settings);
        let extraction = match tokio::time::timeout(limit, run).await {
            Ok(Ok(extraction)) => extraction,
            Ok(Err(e)) => {
                warn!(tenant = %tenant_id, file = %source.filename, error = %e, "extraction failed");
                return Ok(IngestOutcome::Failed {
                    path: request.path,
                    error: format!("{:#}", e),
                });
            }
            Err(_) => {
                warn!(tenant = %tenant_id, file = %source.filename, limit_secs = limit.as_secs(), "extraction timed out");
                extract::timed_out(&source, media_type, limit)
            }
        };

        let reason = extraction.degradation.clone();
        let document = assemble_document(
            &tenant_id,
            request.explicit_id.as_deref(),
            &source,
            media_type,
            extraction,
        );
        self.store
            .upsert_document(&document)
            .await
            .map_err(HarnessError::storage)?;

        Ok(match reason {
            Some(reason) => {
                warn!(tenant = %tenant_id, file = %document.filename, reason = %reason, "stored degraded document");
                IngestOutcome::Degraded { document, reason }
            }
            None => IngestOutcome::Ingested(document),
        })
    }

    /// Ingest independent files on the worker pool. Outcomes are returned
    /// in request order. The first storage error fails the batch.
    pub async fn ingest_batch(
        &self,
        requests: Vec<IngestRequest>,
    ) -> Result<Vec<IngestOutcome>, HarnessError> {
        if requests.is_empty() {
            return Err(HarnessError::validation("no files to ingest"));
        }
        for request in &requests {
            require_tenant(&request.tenant_id)?;
        }

        let results = run_indexed(requests.len(), self.settings.workers, |i| {
            let this = self.clone();
            let request = requests[i].clone();
            async move { this.ingest_file(request).await }
        })
        .await;

        let mut outcomes = Vec::with_capacity(results.len());
        for (request, result) in requests.iter().zip(results) {
            match result {
                Some(Ok(outcome)) => outcomes.push(outcome),
                Some(Err(e)) => return Err(e),
                None => outcomes.push(IngestOutcome::Failed {
                    path: request.path.clone(),
                    error: "ingestion task panicked".to_string(),
                }),
            }
        }
        Ok(outcomes)
    }
}

async fn describe_source(request: &IngestRequest) -> Result<SourceFile> {
    let meta = tokio::fs::metadata(&request.path).await?;
    if !meta.is_file() {
        bail!("{} is not a regular file", request.path.display());
    }
    let filename = match &request.filename {
        Some(name) => name.clone(),
        None => request
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string()),
    };
    let extension = match &request.extension {
        Some(ext) => normalize_extension(ext),
        None => extension_of(&filename),
    };
    Ok(SourceFile {
        path: request.path.clone(),
        filename,
        extension,
        size_bytes: meta.len(),
    })
}

/// Expand files and directories into a sorted list of files. Directories
/// are walked recursively; hidden entries are skipped.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// `mh ingest`: ingest files into a tenant and print per-file outcomes.
pub async fn run_ingest(
    config: &Config,
    tenant: &str,
    paths: &[PathBuf],
    explicit_id: Option<String>,
) -> Result<()> {
    let tenant = require_tenant(tenant)?.to_string();
    let files = expand_paths(paths)?;
    if files.is_empty() {
        return Err(HarnessError::validation("no files to ingest").into());
    }
    if explicit_id.is_some() && files.len() != 1 {
        bail!("--id requires exactly one file, got {}", files.len());
    }

    let caps = Capabilities::from_config(config)?;
    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool.clone()));
    let ingestor = Ingestor::new(store, caps, config.ingest.clone());

    let requests: Vec<IngestRequest> = files
        .into_iter()
        .map(|path| {
            let request = IngestRequest::new(tenant.clone(), path);
            match &explicit_id {
                Some(id) => request.with_id(id.clone()),
                None => request,
            }
        })
        .collect();

    let outcomes = ingestor.ingest_batch(requests).await;
    pool.close().await;
    let outcomes = outcomes?;

    println!("ingest {}", tenant);
    for outcome in &outcomes {
        match outcome {
            IngestOutcome::Ingested(doc) => {
                println!("  ok        {} ({}, {})", doc.filename, doc.media_type, doc.id)
            }
            IngestOutcome::Degraded { document, reason } => println!(
                "  degraded  {} ({}, {}): {}",
                document.filename, document.media_type, document.id, reason
            ),
            IngestOutcome::Failed { path, error } => {
                println!("  failed    {}: {}", path.display(), error)
            }
        }
    }
    let summary = IngestSummary::from_outcomes(&outcomes);
    println!("  ingested: {}", summary.ingested);
    println!("  degraded: {}", summary.degraded);
    println!("  failed: {}", summary.failed);
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn directories_expand_recursively_without_hidden_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("docs/nested")).unwrap();
        fs::create_dir_all(tmp.path().join("docs/.git")).unwrap();
        fs::write(tmp.path().join("docs/b.txt"), "b").unwrap();
        fs::write(tmp.path().join("docs/nested/a.png"), "a").unwrap();
        fs::write(tmp.path().join("docs/.hidden"), "h").unwrap();
        fs::write(tmp.path().join("docs/.git/config"), "g").unwrap();
        let single = tmp.path().join("single.mp3");
        fs::write(&single, "s").unwrap();

        let files = expand_paths(&[tmp.path().join("docs"), single.clone()]).unwrap();
        assert_eq!(
            files,
            vec![
                tmp.path().join("docs/b.txt"),
                tmp.path().join("docs/nested/a.png"),
                single,
            ]
        );
    }

    #[test]
    fn summary_counts_each_outcome() {
        let doc = Document {
            id: "1".to_string(),
            tenant_id: "t".to_string(),
            filename: "a.txt".to_string(),
            file_type: "txt".to_string(),
            media_type: media_harness_core::MediaType::Text,
            content: String::new(),
            extracted_text: String::new(),
            features_json: "{}".to_string(),
            file_size_kb: 0,
            created_at: 0,
        };
        let outcomes = vec![
            IngestOutcome::Ingested(doc.clone()),
            IngestOutcome::Degraded {
                document: doc,
                reason: "ocr failed".to_string(),
            },
            IngestOutcome::Failed {
                path: PathBuf::from("gone.txt"),
                error: "not found".to_string(),
            },
        ];
        assert_eq!(
            IngestSummary::from_outcomes(&outcomes),
            IngestSummary {
                ingested: 1,
                degraded: 1,
                failed: 1
            }
        );
        assert!(outcomes[2].document().is_none());
    }
}
