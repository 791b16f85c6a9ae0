//! Tenant administration: list, create, inspect and clean up partitions.

use anyhow::Result;
use media_harness_core::error::require_tenant;
use media_harness_core::store::Store;
use media_harness_core::{Document, HarnessError, MediaType, TenantSummary};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::search::excerpt;
use crate::sqlite_store::SqliteStore;

/// Which documents a cleanup removes. With no filter set, the whole
/// tenant is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupFilter {
    pub media_type: Option<MediaType>,
    pub degraded_only: bool,
}

impl CleanupFilter {
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(media_type) = self.media_type {
            if doc.media_type != media_type {
                return false;
            }
        }
        !self.degraded_only || doc.is_degraded()
    }
}

/// Mint a fresh tenant id. Tenants exist implicitly once they hold a
/// document.
pub fn create_tenant(name: Option<&str>) -> String {
    let id = Uuid::new_v4().to_string();
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{}-{}", slug(name), &id[..8]),
        None => id,
    }
}

fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "tenant".to_string()
    } else {
        trimmed.to_string()
    }
}

pub async fn list_tenants(store: &dyn Store) -> Result<Vec<TenantSummary>, HarnessError> {
    store.list_tenants().await.map_err(HarnessError::storage)
}

/// Documents of one tenant, or of every tenant when `tenant` is `None`.
pub async fn contents(store: &dyn Store, tenant: Option<&str>) -> Result<Vec<Document>, HarnessError> {
    let result = match tenant {
        Some(t) => store.list_documents(require_tenant(t)?).await,
        None => store.list_all().await,
    };
    result.map_err(HarnessError::storage)
}

pub async fn cleanup(
    store: &dyn Store,
    tenant: &str,
    filter: &CleanupFilter,
) -> Result<u64, HarnessError> {
    let tenant = require_tenant(tenant)?;
    let deleted = store
        .delete_where(tenant, &|doc: &Document| filter.matches(doc))
        .await
        .map_err(HarnessError::storage)?;
    info!(tenant = %tenant, deleted, ?filter, "cleanup finished");
    Ok(deleted)
}

/// `mh tenants list`
pub async fn run_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let tenants = list_tenants(&store).await;
    pool.close().await;
    let tenants = tenants?;

    if tenants.is_empty() {
        println!("No tenants.");
        return Ok(());
    }
    println!("{:<40} DOCUMENTS", "TENANT");
    for t in &tenants {
        println!("{:<40} {}", t.tenant_id, t.document_count);
    }
    Ok(())
}

/// `mh tenants create`
pub fn run_create(name: Option<&str>) -> Result<()> {
    println!("{}", create_tenant(name));
    Ok(())
}

/// One document as printed by `mh contents`, one field per line.
pub fn describe_document(doc: &Document) -> String {
    let created = chrono::DateTime::from_timestamp(doc.created_at, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    let mut out = format!("--- {} / {} ---\n", doc.tenant_id, doc.filename);
    out.push_str(&format!("id:         {}\n", doc.id));
    out.push_str(&format!("media_type: {}\n", doc.media_type));
    out.push_str(&format!("file_type:  {}\n", doc.file_type));
    out.push_str(&format!("size_kb:    {}\n", doc.file_size_kb));
    out.push_str(&format!("created_at: {}\n", created));
    out.push_str(&format!("features:   {}\n", doc.features_json));
    out.push_str(&format!("content:    \"{}\"\n", excerpt(&doc.content, 120)));
    out.push_str(&format!("extracted:  \"{}\"\n", excerpt(&doc.extracted_text, 120)));
    if let Some(reason) = doc.degradation() {
        out.push_str(&format!("degraded:   {}\n", reason));
    }
    out
}

/// `mh contents`
pub async fn run_contents(config: &Config, tenant: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let docs = contents(&store, tenant).await;
    pool.close().await;
    let docs = docs?;

    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for doc in &docs {
        println!("{}", describe_document(doc));
    }
    println!("{} documents", docs.len());
    Ok(())
}

/// `mh cleanup`
pub async fn run_cleanup(config: &Config, tenant: &str, filter: CleanupFilter) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let deleted = cleanup(&store, tenant, &filter).await;
    pool.close().await;

    println!("cleanup {}", tenant.trim());
    println!("  deleted: {}", deleted?);
    println!("ok");
    Ok(())
}
