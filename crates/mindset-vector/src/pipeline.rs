//! Document ingestion pipeline.
//!
//! Walks the docs directory for `.md`/`.txt` files, splits each into
//! overlapping chunks, embeds them in batches and upserts them into the
//! vector store with `{source, chunk}` metadata.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use mindset_core::error::MindsetError;

use crate::chunker::TextChunker;
use crate::embedding::EmbeddingService;
use crate::index::{IndexedChunk, VectorStore};

const EMBED_BATCH_SIZE: usize = 64;
const DOC_EXTENSIONS: &[&str] = &["md", "txt"];

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Candidate files found under the docs directory.
    pub files_found: usize,
    /// Files that were empty or unreadable.
    pub files_skipped: usize,
    pub chunks_indexed: usize,
}

pub struct IngestPipeline<E: EmbeddingService> {
    embedder: E,
    store: Arc<dyn VectorStore>,
    chunker: TextChunker,
}

impl<E: EmbeddingService> IngestPipeline<E> {
    pub fn new(embedder: E, store: Arc<dyn VectorStore>, chunker: TextChunker) -> Self {
        Self {
            embedder,
            store,
            chunker,
        }
    }

    /// All `.md`/`.txt` files under `docs_dir`, sorted for stable ordering.
    pub fn discover(docs_dir: &Path) -> Result<Vec<PathBuf>, MindsetError> {
        if !docs_dir.is_dir() {
            return Err(MindsetError::NotFound(format!(
                "docs directory {} does not exist",
                docs_dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(docs_dir)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| DOC_EXTENSIONS.contains(&ext))
            })
            .collect();

        paths.sort();
        Ok(paths)
    }

    /// Ingest every document under `docs_dir`.
    pub async fn ingest_dir(&self, docs_dir: &Path) -> Result<IngestReport, MindsetError> {
        let paths = Self::discover(docs_dir)?;
        let mut report = IngestReport {
            files_found: paths.len(),
            ..Default::default()
        };

        if paths.is_empty() {
            warn!("No .md or .txt files found in {}", docs_dir.display());
            return Ok(report);
        }

        self.store
            .ensure_collection(self.embedder.dimensions())
            .await?;

        let mut pending: Vec<(String, usize, String)> = Vec::new();

        for path in &paths {
            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.files_skipped += 1;
                    continue;
                }
            };

            if text.trim().is_empty() {
                warn!("Skipping empty document {}", path.display());
                report.files_skipped += 1;
                continue;
            }

            let source = path.display().to_string();
            let chunks = self.chunker.split(&text);
            debug!(source = %source, chunks = chunks.len(), "Chunked document");

            for (i, chunk) in chunks.into_iter().enumerate() {
                pending.push((source.clone(), i, chunk));
                if pending.len() >= EMBED_BATCH_SIZE {
                    report.chunks_indexed += self.flush(&mut pending).await?;
                }
            }
        }

        report.chunks_indexed += self.flush(&mut pending).await?;

        info!(
            files = report.files_found,
            skipped = report.files_skipped,
            chunks = report.chunks_indexed,
            "Ingestion complete"
        );
        Ok(report)
    }

    async fn flush(
        &self,
        pending: &mut Vec<(String, usize, String)>,
    ) -> Result<usize, MindsetError> {
        if pending.is_empty() {
            return Ok(0);
        }

        let batch = std::mem::take(pending);
        let texts: Vec<String> = batch.iter().map(|(_, _, text)| text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let chunks = batch
            .into_iter()
            .zip(vectors)
            .map(|((source, chunk, content), embedding)| IndexedChunk {
                id: IndexedChunk::point_id(&source, chunk),
                content,
                source,
                chunk,
                embedding,
            })
            .collect();

        self.store.upsert(chunks).await
    }
}
