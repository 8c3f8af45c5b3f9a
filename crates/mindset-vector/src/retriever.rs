//! Context retrieval for the chat pipeline.
//!
//! `ContextRetriever` embeds the user's message and asks the vector store for
//! the nearest chunks. `NoContext` is used when retrieval is disabled.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use mindset_core::error::{MindsetError, Result};
use mindset_core::ports::ContextIndex;
use mindset_core::types::RetrievedSnippet;

use crate::embedding::EmbeddingService;
use crate::index::VectorStore;

pub struct ContextRetriever<E: EmbeddingService> {
    embedder: E,
    store: Arc<dyn VectorStore>,
}

impl<E: EmbeddingService> ContextRetriever<E> {
    pub fn new(embedder: E, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl<E: EmbeddingService> ContextIndex for ContextRetriever<E> {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedSnippet>> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| MindsetError::Retrieval(e.to_string()))?;

        let mut snippets: Vec<RetrievedSnippet> = self
            .store
            .search(vector, limit)
            .await?
            .into_iter()
            .map(|hit| RetrievedSnippet {
                content: hit.content,
                score: hit.score,
                source: hit.source,
            })
            .collect();

        snippets.sort_by(|a, b| b.score.total_cmp(&a.score));
        snippets.truncate(limit);

        debug!(count = snippets.len(), limit, "Retrieved context snippets");
        Ok(snippets)
    }
}

/// Index that never returns anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

#[async_trait]
impl ContextIndex for NoContext {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<RetrievedSnippet>> {
        Ok(Vec::new())
    }
}
