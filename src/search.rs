use anyhow::Result;
use media_harness_core::error::require_tenant;
use media_harness_core::search::search;
use media_harness_core::HarnessError;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// `mh search`: print the ranked keyword-overlap results for a tenant.
pub async fn run_search(
    config: &Config,
    tenant: &str,
    query: &str,
    limit: Option<usize>,
) -> Result<()> {
    let tenant = require_tenant(tenant)?;
    if query.trim().is_empty() {
        return Err(HarnessError::validation("query is required").into());
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let ranked = search(&store, tenant, query).await;
    pool.close().await;
    let mut ranked = ranked?;

    if ranked.is_empty() {
        println!("No results.");
        return Ok(());
    }
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    for (i, result) in ranked.iter().enumerate() {
        let doc = &result.document;
        println!(
            "{}. [{}] {} ({})",
            i + 1,
            result.score,
            doc.filename,
            doc.media_type
        );
        let excerpt_source = if doc.extracted_text.is_empty() {
            &doc.content
        } else {
            &doc.extracted_text
        };
        println!("    excerpt: \"{}\"", excerpt(excerpt_source, 120));
        if let Some(reason) = doc.degradation() {
            println!("    degraded: {}", reason);
        }
        println!("    id: {}", doc.id);
        println!();
    }
    Ok(())
}

/// First `max_chars` characters on one line.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_flattens_and_truncates() {
        assert_eq!(excerpt("a\n  b", 10), "a b");
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("héllo", 5), "héllo");
    }
}
