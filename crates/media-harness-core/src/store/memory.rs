//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Documents live in a single `Vec` behind `std::sync::RwLock`, which keeps
//! insertion order for full-scan reads. Upserts replace in place.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Document, TenantSummary};

use super::{DocumentPredicate, Store};

/// In-memory store for tests and embedders.
pub struct InMemoryStore {
    docs: RwLock<Vec<Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Document>>> {
        self.docs
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Document>>> {
        self.docs
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_document(&self, doc: &Document) -> Result<()> {
        let mut docs = self.write()?;
        match docs
            .iter_mut()
            .find(|d| d.tenant_id == doc.tenant_id && d.id == doc.id)
        {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        Ok(())
    }

    async fn get_document(&self, tenant_id: &str, id: &str) -> Result<Option<Document>> {
        let docs = self.read()?;
        Ok(docs
            .iter()
            .find(|d| d.tenant_id == tenant_id && d.id == id)
            .cloned())
    }

    async fn list_documents(&self, tenant_id: &str) -> Result<Vec<Document>> {
        let docs = self.read()?;
        Ok(docs
            .iter()
            .filter(|d| d.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn count_documents(&self, tenant_id: &str) -> Result<u64> {
        let docs = self.read()?;
        Ok(docs.iter().filter(|d| d.tenant_id == tenant_id).count() as u64)
    }

    async fn delete_where(
        &self,
        tenant_id: &str,
        predicate: DocumentPredicate<'_>,
    ) -> Result<u64> {
        let mut docs = self.write()?;
        let before = docs.len();
        docs.retain(|d| !(d.tenant_id == tenant_id && predicate(d)));
        Ok((before - docs.len()) as u64)
    }

    async fn list_tenants(&self) -> Result<Vec<TenantSummary>> {
        let docs = self.read()?;
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for d in docs.iter() {
            *counts.entry(d.tenant_id.as_str()).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(tenant_id, document_count)| TenantSummary {
                tenant_id: tenant_id.to_string(),
                document_count,
            })
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Document>> {
        let mut all = self.read()?.clone();
        all.sort_by(|a, b| {
            a.tenant_id
                .cmp(&b.tenant_id)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;

    fn doc(tenant: &str, id: &str, filename: &str) -> Document {
        Document {
            id: id.to_string(),
            tenant_id: tenant.to_string(),
            filename: filename.to_string(),
            file_type: "txt".to_string(),
            media_type: MediaType::Text,
            content: format!("body of {}", filename),
            extracted_text: String::new(),
            features_json: "{}".to_string(),
            file_size_kb: 0,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn upsert_same_id_overwrites_without_duplicating() {
        let store = InMemoryStore::new();
        store.upsert_document(&doc("t1", "a", "one.txt")).await.unwrap();
        let mut updated = doc("t1", "a", "one.txt");
        updated.content = "rewritten".to_string();
        store.upsert_document(&updated).await.unwrap();

        assert_eq!(store.count_documents("t1").await.unwrap(), 1);
        let got = store.get_document("t1", "a").await.unwrap().unwrap();
        assert_eq!(got.content, "rewritten");
    }

    #[tokio::test]
    async fn same_id_in_other_tenant_is_distinct() {
        let store = InMemoryStore::new();
        store.upsert_document(&doc("t1", "a", "one.txt")).await.unwrap();
        store.upsert_document(&doc("t2", "a", "one.txt")).await.unwrap();
        assert_eq!(store.count_documents("t1").await.unwrap(), 1);
        assert_eq!(store.count_documents("t2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_documents_keeps_insertion_order() {
        let store = InMemoryStore::new();
        store.upsert_document(&doc("t1", "b", "z.txt")).await.unwrap();
        store.upsert_document(&doc("t1", "a", "a.txt")).await.unwrap();
        let ids: Vec<String> = store
            .list_documents("t1")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn delete_where_is_tenant_scoped() {
        let store = InMemoryStore::new();
        store.upsert_document(&doc("t1", "a", "one.txt")).await.unwrap();
        store.upsert_document(&doc("t1", "b", "two.txt")).await.unwrap();
        store.upsert_document(&doc("t2", "c", "one.txt")).await.unwrap();

        let deleted = store
            .delete_where("t1", &|d: &Document| d.filename == "one.txt")
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count_documents("t1").await.unwrap(), 1);
        assert_eq!(store.count_documents("t2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_tenants_counts_per_tenant() {
        let store = InMemoryStore::new();
        store.upsert_document(&doc("t2", "a", "x.txt")).await.unwrap();
        store.upsert_document(&doc("t1", "b", "y.txt")).await.unwrap();
        store.upsert_document(&doc("t2", "c", "z.txt")).await.unwrap();
        let tenants = store.list_tenants().await.unwrap();
        assert_eq!(
            tenants,
            vec![
                TenantSummary {
                    tenant_id: "t1".to_string(),
                    document_count: 1
                },
                TenantSummary {
                    tenant_id: "t2".to_string(),
                    document_count: 2
                },
            ]
        );
        assert!(!store.has_documents("t3").await.unwrap());
    }
}
