//! Grounded question answering over one tenant.
//!
//! # States
//!
//! ```text
//! CHECK_HAS_DOCS ──empty──▶ NO_DOCS
//!       │
//!    RETRIEVE ─────empty──▶ NO_MATCH
//!       │
//! FORMAT_CONTEXT ▶ GENERATE ▶ RESPOND_WITH_SOURCES
//! ```
//!
//! `NO_DOCS` and `NO_MATCH` are answers, not errors. A generation failure
//! fails the request and is not retried here.

use anyhow::Result;
use media_harness_core::error::require_tenant;
use media_harness_core::grounding::build_context;
use media_harness_core::search::search;
use media_harness_core::store::Store;
use media_harness_core::{Document, HarnessError};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::db;
use crate::providers::{create_generation_provider, GenerationProvider};
use crate::sqlite_store::SqliteStore;

pub const NO_DOCS: &str =
    "I don't have any documents to search through. Please upload some documents first.";
pub const NO_MATCH: &str = "I couldn't find any relevant information in the documents. Could you try rephrasing your question or provide more specific details?";

const PROMPT_TEMPLATE: &str = "You are a helpful AI assistant that helps users find and understand information from their documents, including videos and audio files.
Your task is to provide a clear, concise, and natural response to the user's question based on the provided context.
Focus on the actual content and meaning of the information.

Context:
{documents}

User Question: {question}

Instructions:
1. For videos, use the transcription and key frame information to describe the content
2. For audio, use the transcription to explain what was said
3. For images, describe the visual content and any text found
4. Provide a natural, conversational response
5. Focus on answering the user's question directly
6. Use the context to support your answer
7. If you're not sure about something, say so
8. Do not mention technical details about text extraction or coordinates

Answer: Let me help you with that.";

/// Which terminal state a chat request reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    NoDocuments,
    NoMatch,
    Answered,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub outcome: ChatOutcome,
    pub text: String,
    /// Documents that grounded the answer, best first. Empty for sentinels.
    pub documents: Vec<Document>,
}

impl ChatResponse {
    fn sentinel(outcome: ChatOutcome, text: &str) -> Self {
        Self {
            outcome,
            text: text.to_string(),
            documents: Vec::new(),
        }
    }
}

pub fn build_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{documents}", context)
        .replace("{question}", question)
}

/// `"\n\nSources:\n1. a.txt\n2. b.png"`
pub fn sources_suffix(documents: &[Document]) -> String {
    let lines = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("{}. {}", i + 1, doc.filename))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\nSources:\n{}", lines)
}

pub struct ChatOrchestrator {
    store: Arc<dyn Store>,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
}

impl ChatOrchestrator {
    pub fn new(store: Arc<dyn Store>, generator: Arc<dyn GenerationProvider>, top_k: usize) -> Self {
        Self {
            store,
            generator,
            top_k: top_k.max(1),
        }
    }

    pub async fn chat(&self, tenant_id: &str, question: &str) -> Result<ChatResponse, HarnessError> {
        let tenant_id = require_tenant(tenant_id)?;
        let question = question.trim();
        if question.is_empty() {
            return Err(HarnessError::validation("query is required"));
        }

        if !self
            .store
            .has_documents(tenant_id)
            .await
            .map_err(HarnessError::storage)?
        {
            debug!(tenant = %tenant_id, "tenant has no documents");
            return Ok(ChatResponse::sentinel(ChatOutcome::NoDocuments, NO_DOCS));
        }

        let ranked = search(self.store.as_ref(), tenant_id, question)
            .await
            .map_err(HarnessError::storage)?;
        if ranked.is_empty() {
            debug!(tenant = %tenant_id, "no document matched");
            return Ok(ChatResponse::sentinel(ChatOutcome::NoMatch, NO_MATCH));
        }

        let documents: Vec<Document> = ranked
            .into_iter()
            .take(self.top_k)
            .map(|scored| scored.document)
            .collect();
        let context = build_context(&documents);
        let prompt = build_prompt(&context, question);

        info!(
            tenant = %tenant_id,
            documents = documents.len(),
            provider = self.generator.name(),
            "generating answer"
        );
        let answer = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| HarnessError::Generation(e.to_string()))?;

        Ok(ChatResponse {
            outcome: ChatOutcome::Answered,
            text: format!("{}{}", answer, sources_suffix(&documents)),
            documents,
        })
    }
}

/// `mh ask`: answer one question against a tenant.
pub async fn run_ask(config: &Config, tenant: &str, question: &str) -> Result<()> {
    let generator = create_generation_provider(&config.providers)?;
    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool.clone()));
    let orchestrator = ChatOrchestrator::new(store, generator, config.retrieval.top_k);

    let response = orchestrator.chat(tenant, question).await;
    pool.close().await;

    println!("{}", response?.text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use media_harness_core::store::memory::InMemoryStore;
    use media_harness_core::MediaType;
    use std::sync::Mutex;

    struct EchoGenerator {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl EchoGenerator {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl GenerationProvider for EchoGenerator {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(ProviderError::Http {
                    status: 500,
                    body: "upstream".to_string(),
                });
            }
            Ok("The cat sat.".to_string())
        }
    }

    fn doc(id: &str, filename: &str, content: &str) -> Document {
        Document {
            id: id.to_string(),
            tenant_id: "t1".to_string(),
            filename: filename.to_string(),
            file_type: "txt".to_string(),
            media_type: MediaType::Text,
            content: content.to_string(),
            extracted_text: String::new(),
            features_json: "{}".to_string(),
            file_size_kb: 0,
            created_at: 0,
        }
    }

    async fn seeded(docs: &[Document]) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for d in docs {
            store.upsert_document(d).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn empty_tenant_gets_no_docs_sentinel() {
        let generator = EchoGenerator::new(false);
        let chat = ChatOrchestrator::new(seeded(&[]).await, generator.clone(), 5);
        let response = chat.chat("t1", "anything at all").await.unwrap();
        assert_eq!(response.outcome, ChatOutcome::NoDocuments);
        assert_eq!(response.text, NO_DOCS);
        assert!(response.documents.is_empty());
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unmatched_query_gets_no_match_sentinel() {
        let store = seeded(&[doc("a", "a.txt", "a cat sat")]).await;
        let chat = ChatOrchestrator::new(store, EchoGenerator::new(false), 5);
        let response = chat.chat("t1", "zebra").await.unwrap();
        assert_eq!(response.outcome, ChatOutcome::NoMatch);
        assert_eq!(response.text, NO_MATCH);

        // Only short tokens: nothing survives, still a sentinel.
        let response = chat.chat("t1", "a an").await.unwrap();
        assert_eq!(response.outcome, ChatOutcome::NoMatch);
    }

    #[tokio::test]
    async fn answer_carries_sources_in_rank_order() {
        let store = seeded(&[
            doc("a", "a.txt", "a cat sat"),
            doc("c", "c.txt", "cat dog"),
            doc("x", "x.txt", "nothing here"),
        ])
        .await;
        let generator = EchoGenerator::new(false);
        let chat = ChatOrchestrator::new(store, generator.clone(), 5);
        let response = chat.chat("t1", "cat dog").await.unwrap();

        assert_eq!(response.outcome, ChatOutcome::Answered);
        assert_eq!(response.text, "The cat sat.\n\nSources:\n1. c.txt\n2. a.txt");
        let prompt = generator.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("Context:\ncat dog\n\na cat sat\n\nUser Question: cat dog"));
    }

    #[tokio::test]
    async fn results_are_truncated_to_top_k() {
        let store = seeded(&[
            doc("1", "1.txt", "cat"),
            doc("2", "2.txt", "cat"),
            doc("3", "3.txt", "cat"),
        ])
        .await;
        let chat = ChatOrchestrator::new(store, EchoGenerator::new(false), 2);
        let response = chat.chat("t1", "cat").await.unwrap();
        assert_eq!(response.documents.len(), 2);
        assert!(response.text.ends_with("Sources:\n1. 1.txt\n2. 2.txt"));
    }

    #[tokio::test]
    async fn generation_failure_is_fatal() {
        let store = seeded(&[doc("a", "a.txt", "cat")]).await;
        let chat = ChatOrchestrator::new(store, EchoGenerator::new(true), 5);
        let err = chat.chat("t1", "cat").await.unwrap_err();
        assert!(matches!(err, HarnessError::Generation(_)));
    }

    #[tokio::test]
    async fn blank_inputs_are_validation_errors() {
        let chat = ChatOrchestrator::new(seeded(&[]).await, EchoGenerator::new(false), 5);
        assert!(matches!(
            chat.chat(" ", "cat").await.unwrap_err(),
            HarnessError::Validation(_)
        ));
        assert!(matches!(
            chat.chat("t1", "   ").await.unwrap_err(),
            HarnessError::Validation(_)
        ));
    }
}
