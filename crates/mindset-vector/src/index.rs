//! Similarity index backends.
//!
//! `QdrantStore` talks to an external Qdrant collection and is what the
//! server and ingestion use. `InMemoryStore` does brute-force cosine search
//! over a local map and backs tests and offline runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};
use uuid::Uuid;

use mindset_core::config::RetrievalConfig;
use mindset_core::error::MindsetError;

/// A chunk of reference text ready to be indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub id: Uuid,
    pub content: String,
    /// Originating file path or URL.
    pub source: String,
    /// Position of the chunk within its source.
    pub chunk: usize,
    pub embedding: Vec<f32>,
}

impl IndexedChunk {
    /// Stable id derived from source and position, so re-ingesting a file
    /// overwrites its previous chunks instead of duplicating them.
    pub fn point_id(source: &str, chunk: usize) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("{}#{}", source, chunk).as_bytes())
    }
}

/// A single hit returned from a vector search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub content: String,
    pub source: String,
    /// Cosine similarity; higher is closer.
    pub score: f32,
}

/// Storage and nearest-neighbour search over chunk embeddings.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the backing collection if it does not exist yet.
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), MindsetError>;

    /// Insert or overwrite chunks. Returns the number written.
    async fn upsert(&self, chunks: Vec<IndexedChunk>) -> Result<usize, MindsetError>;

    /// Up to `limit` hits closest to `query`, best first.
    async fn search(&self, query: Vec<f32>, limit: usize) -> Result<Vec<SearchHit>, MindsetError>;
}

// ---------------------------------------------------------------------------
// QdrantStore
// ---------------------------------------------------------------------------

/// Vector store backed by a Qdrant collection.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    /// Connect to Qdrant using the `[retrieval]` config section.
    ///
    /// The client connects lazily; the first request surfaces an unreachable
    /// server.
    pub fn connect(config: &RetrievalConfig) -> Result<Self, MindsetError> {
        debug!(url = %config.qdrant_url, "Connecting to Qdrant");

        let client = Qdrant::from_url(&config.qdrant_url)
            .api_key(config.qdrant_api_key.clone())
            .build()
            .map_err(|e| {
                MindsetError::Retrieval(format!("Failed to create Qdrant client: {}", e))
            })?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), MindsetError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| MindsetError::Retrieval(format!("Failed to check collection: {}", e)))?;

        if exists {
            debug!(collection = %self.collection, "Collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(dimensions as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| MindsetError::Retrieval(format!("Failed to create collection: {}", e)))?;

        info!(collection = %self.collection, dimensions, "Created collection");
        Ok(())
    }

    async fn upsert(&self, chunks: Vec<IndexedChunk>) -> Result<usize, MindsetError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let count = chunks.len();
        let points: Vec<PointStruct> = chunks
            .into_iter()
            .map(|chunk| {
                let payload: HashMap<String, Value> = [
                    ("content".to_string(), Value::from(chunk.content)),
                    ("source".to_string(), Value::from(chunk.source)),
                    ("chunk".to_string(), Value::from(chunk.chunk as i64)),
                ]
                .into_iter()
                .collect();
                PointStruct::new(chunk.id.to_string(), chunk.embedding, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| MindsetError::Retrieval(format!("Failed to upsert points: {}", e)))?;

        debug!(collection = %self.collection, count, "Upserted points");
        Ok(count)
    }

    async fn search(&self, query: Vec<f32>, limit: usize) -> Result<Vec<SearchHit>, MindsetError> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query, limit as u64).with_payload(true),
            )
            .await
            .map_err(|e| MindsetError::Retrieval(format!("Search failed: {}", e)))?;

        let hits = response
            .result
            .into_iter()
            .filter_map(|point| {
                let content = get_string(&point.payload, "content")?;
                let source = get_string(&point.payload, "source").unwrap_or_default();
                Some(SearchHit {
                    content,
                    source,
                    score: point.score,
                })
            })
            .collect();

        Ok(hits)
    }
}

fn get_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

/// In-memory vector store using brute-force cosine similarity.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<Uuid, IndexedChunk>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all stored chunks, in no particular order.
    pub fn chunks(&self) -> Vec<IndexedChunk> {
        self.entries
            .read()
            .map(|e| e.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(&self, _dimensions: usize) -> Result<(), MindsetError> {
        Ok(())
    }

    async fn upsert(&self, chunks: Vec<IndexedChunk>) -> Result<usize, MindsetError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| MindsetError::Retrieval(format!("Lock poisoned: {}", e)))?;
        let count = chunks.len();
        for chunk in chunks {
            entries.insert(chunk.id, chunk);
        }
        Ok(count)
    }

    async fn search(&self, query: Vec<f32>, limit: usize) -> Result<Vec<SearchHit>, MindsetError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| MindsetError::Retrieval(format!("Lock poisoned: {}", e)))?;

        let mut hits: Vec<SearchHit> = entries
            .values()
            .map(|chunk| SearchHit {
                content: chunk.content.clone(),
                source: chunk.source.clone(),
                score: cosine_similarity(&query, &chunk.embedding),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Cosine similarity between two vectors. Zero when either is a zero vector
/// or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
