//! Keyword-overlap retrieval scorer.
//!
//! Ranks a tenant's documents against a natural-language query without any
//! index: the store returns a full tenant scan and scoring happens here.
//!
//! # Scoring Algorithm
//!
//! 1. Lower-case the query and split on whitespace.
//! 2. Drop tokens of two characters or fewer. No tokens left → no results.
//! 3. For each document, count the tokens contained (case-insensitive
//!    substring) in `content`, plus the tokens contained in
//!    `extracted_text`. A token found in both fields counts twice.
//! 4. Keep documents with a non-zero score.
//! 5. Sort by score, descending. The sort is stable, so equal scores keep
//!    store order.
//!
//! Matching on the document side is plain substring containment, so the
//! token `cat` also matches `category`. No truncation happens here: the
//! caller applies its own top-k.

use anyhow::Result;
use serde::Serialize;

use crate::models::Document;
use crate::store::Store;

/// Tokens must be strictly longer than this (in characters) to count.
pub const MAX_IGNORED_TOKEN_CHARS: usize = 2;

/// A document paired with its overlap score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub score: usize,
    pub document: Document,
}

/// Split a query into the lower-cased tokens that participate in scoring.
///
/// ```rust
/// use media_harness_core::search::query_tokens;
///
/// assert_eq!(query_tokens("Where is the CAT?"), vec!["where", "the", "cat?"]);
/// assert!(query_tokens("a an to").is_empty());
/// ```
pub fn query_tokens(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > MAX_IGNORED_TOKEN_CHARS)
        .map(|t| t.to_string())
        .collect()
}

/// Score one document against pre-tokenized query terms.
pub fn score_document(tokens: &[String], doc: &Document) -> usize {
    let content = doc.content.to_lowercase();
    let extracted = doc.extracted_text.to_lowercase();
    let in_content = tokens.iter().filter(|t| content.contains(t.as_str())).count();
    let in_extracted = tokens
        .iter()
        .filter(|t| extracted.contains(t.as_str()))
        .count();
    in_content + in_extracted
}

/// Rank `docs` against `query`, returning every matching document.
pub fn rank_documents(query: &str, docs: Vec<Document>) -> Vec<ScoredDocument> {
    let tokens = query_tokens(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredDocument> = docs
        .into_iter()
        .filter_map(|document| {
            let score = score_document(&tokens, &document);
            (score > 0).then_some(ScoredDocument { score, document })
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Scan a tenant through a [`Store`] and rank its documents.
///
/// Skips the scan entirely when the query has no usable tokens.
pub async fn search<S: Store + ?Sized>(
    store: &S,
    tenant_id: &str,
    query: &str,
) -> Result<Vec<ScoredDocument>> {
    if query_tokens(query).is_empty() {
        return Ok(Vec::new());
    }
    let docs = store.list_documents(tenant_id).await?;
    Ok(rank_documents(query, docs))
}
