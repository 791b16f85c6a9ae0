//! SQLite-backed [`Store`] implementation.
//!
//! One `documents` table keyed by `(tenant_id, id)`. Listing order is
//! `rowid`, which an upsert preserves, so a re-ingested document keeps its
//! original position.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use media_harness_core::store::{DocumentPredicate, Store};
use media_harness_core::{Document, MediaType, TenantSummary};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "id, tenant_id, filename, file_type, media_type, content, \
                       extracted_text, features_json, file_size_kb, created_at";

fn row_to_document(row: &SqliteRow) -> Result<Document> {
    let media_type: String = row.get("media_type");
    let size: i64 = row.get("file_size_kb");
    Ok(Document {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        filename: row.get("filename"),
        file_type: row.get("file_type"),
        media_type: media_type.parse::<MediaType>().map_err(|e| anyhow!(e))?,
        content: row.get("content"),
        extracted_text: row.get("extracted_text"),
        features_json: row.get("features_json"),
        file_size_kb: size.max(0) as u64,
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, tenant_id, filename, file_type, media_type, content,
                                   extracted_text, features_json, file_size_kb, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tenant_id, id) DO UPDATE SET
                filename = excluded.filename,
                file_type = excluded.file_type,
                media_type = excluded.media_type,
                content = excluded.content,
                extracted_text = excluded.extracted_text,
                features_json = excluded.features_json,
                file_size_kb = excluded.file_size_kb,
                created_at = excluded.created_at
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.tenant_id)
        .bind(&doc.filename)
        .bind(&doc.file_type)
        .bind(doc.media_type.as_str())
        .bind(&doc.content)
        .bind(&doc.extracted_text)
        .bind(&doc.features_json)
        .bind(doc.file_size_kb as i64)
        .bind(doc.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_document(&self, tenant_id: &str, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE tenant_id = ? AND id = ?",
            COLUMNS
        ))
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn list_documents(&self, tenant_id: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE tenant_id = ? ORDER BY rowid",
            COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn count_documents(&self, tenant_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE tenant_id = ?")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn delete_where(
        &self,
        tenant_id: &str,
        predicate: DocumentPredicate<'_>,
    ) -> Result<u64> {
        let doomed: Vec<String> = self
            .list_documents(tenant_id)
            .await?
            .into_iter()
            .filter(|doc| predicate(doc))
            .map(|doc| doc.id)
            .collect();

        let mut tx = self.pool.begin().await?;
        let mut deleted = 0u64;
        for id in &doomed {
            let result = sqlx::query("DELETE FROM documents WHERE tenant_id = ? AND id = ?")
                .bind(tenant_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            deleted += result.rows_affected();
        }
        tx.commit().await?;

        Ok(deleted)
    }

    async fn list_tenants(&self) -> Result<Vec<TenantSummary>> {
        let rows = sqlx::query(
            "SELECT tenant_id, COUNT(*) AS n FROM documents GROUP BY tenant_id ORDER BY tenant_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let n: i64 = row.get("n");
                TenantSummary {
                    tenant_id: row.get("tenant_id"),
                    document_count: n.max(0) as u64,
                }
            })
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents ORDER BY tenant_id, filename, rowid",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }
}
