//! Storage abstraction for Media Harness.
//!
//! The [`Store`] trait is a tenant-partitioned document store. Scoring is
//! never pushed down into the backend: the retrieval path asks for a full
//! tenant scan and ranks in [`search`](crate::search).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, TenantSummary};

/// Predicate used by [`Store::delete_where`].
pub type DocumentPredicate<'a> = &'a (dyn Fn(&Document) -> bool + Send + Sync);

/// Abstract storage backend for Media Harness.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_document`](Store::upsert_document) | Insert, or overwrite every field of, `(tenant, id)` |
/// | [`get_document`](Store::get_document) | Fetch one document |
/// | [`list_documents`](Store::list_documents) | Full tenant scan in insertion order |
/// | [`count_documents`](Store::count_documents) | Tenant document count |
/// | [`delete_where`](Store::delete_where) | Tenant-scoped cleanup |
/// | [`list_tenants`](Store::list_tenants) | Every tenant with its count |
/// | [`list_all`](Store::list_all) | Every document across tenants |
#[async_trait]
pub trait Store: Send + Sync {
    /// Idempotent merge keyed by `(doc.tenant_id, doc.id)`.
    ///
    /// Re-submitting an existing id overwrites all fields; the tenant's
    /// document count does not change.
    async fn upsert_document(&self, doc: &Document) -> Result<()>;

    async fn get_document(&self, tenant_id: &str, id: &str) -> Result<Option<Document>>;

    /// All documents of a tenant, oldest first.
    async fn list_documents(&self, tenant_id: &str) -> Result<Vec<Document>>;

    async fn count_documents(&self, tenant_id: &str) -> Result<u64>;

    /// Delete every document of `tenant_id` matching `predicate`.
    /// Returns the number of deleted documents.
    async fn delete_where(&self, tenant_id: &str, predicate: DocumentPredicate<'_>)
        -> Result<u64>;

    async fn list_tenants(&self) -> Result<Vec<TenantSummary>>;

    /// Every stored document ordered by tenant, then filename.
    async fn list_all(&self) -> Result<Vec<Document>>;

    async fn has_documents(&self, tenant_id: &str) -> Result<bool> {
        Ok(self.count_documents(tenant_id).await? > 0)
    }
}
