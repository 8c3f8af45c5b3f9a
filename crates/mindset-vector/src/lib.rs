//! Mindset Vector crate - embeddings, similarity index, retrieval and ingestion.
//!
//! Provides the embedding service trait with OpenAI and mock backends, the
//! Qdrant and in-memory vector stores, the context retriever used by the chat
//! pipeline, the recursive text chunker, the document ingestion pipeline, and
//! the crawled-content importer that feeds it.

pub mod chunker;
pub mod crawl;
pub mod embedding;
pub mod index;
pub mod pipeline;
pub mod retriever;

pub use chunker::TextChunker;
pub use crawl::{CrawlImporter, CrawlReport};
pub use embedding::{EmbeddingService, MockEmbedding, OpenAiEmbedding};
pub use index::{InMemoryStore, IndexedChunk, QdrantStore, SearchHit, VectorStore};
pub use pipeline::{IngestPipeline, IngestReport};
pub use retriever::{ContextRetriever, NoContext};
