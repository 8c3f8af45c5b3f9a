//! Import of crawled web content into the docs directory.
//!
//! Queries a RAG endpoint once per source domain and writes each non-empty
//! result to `<docs_dir>/<source_with_underscores>_chunk<i>.txt` with a small
//! metadata header, ready for the ingestion pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mindset_core::config::IngestConfig;
use mindset_core::error::MindsetError;

#[derive(Debug, Serialize)]
struct RagQuery<'a> {
    query: &'a str,
    source: &'a str,
    match_count: usize,
}

#[derive(Debug, Default, Deserialize)]
struct RagResponse {
    #[serde(default)]
    results: Vec<RagResult>,
}

#[derive(Debug, Deserialize)]
struct RagResult {
    #[serde(default)]
    content: String,
    url: Option<String>,
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub sources_queried: usize,
    /// Sources whose request failed outright.
    pub sources_failed: usize,
    pub files_written: usize,
}

pub struct CrawlImporter {
    client: Client,
    endpoint: String,
    query: String,
    match_count: usize,
    sources: Vec<String>,
    docs_dir: PathBuf,
}

impl CrawlImporter {
    pub fn from_config(config: &IngestConfig) -> Result<Self, MindsetError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MindsetError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.crawl_endpoint.clone(),
            query: config.crawl_query.clone(),
            match_count: config.crawl_match_count,
            sources: config.crawl_sources.clone(),
            docs_dir: PathBuf::from(&config.docs_dir),
        })
    }

    /// Query every configured source and write the results to disk.
    pub async fn run(&self) -> Result<CrawlReport, MindsetError> {
        std::fs::create_dir_all(&self.docs_dir)?;
        let mut report = CrawlReport::default();

        for source in &self.sources {
            report.sources_queried += 1;
            info!(source = %source, "Fetching crawled content");

            let results = match self.fetch(source).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(source = %source, "Failed to fetch: {}", e);
                    report.sources_failed += 1;
                    continue;
                }
            };

            if results.is_empty() {
                warn!(source = %source, "No content found");
                continue;
            }

            for (i, result) in results.iter().enumerate() {
                if result.content.trim().is_empty() {
                    continue;
                }
                let path = write_chunk(
                    &self.docs_dir,
                    source,
                    i,
                    result.url.as_deref(),
                    &result.content,
                )?;
                info!("Saved {}", path.display());
                report.files_written += 1;
            }
        }

        Ok(report)
    }

    async fn fetch(&self, source: &str) -> Result<Vec<RagResult>, MindsetError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RagQuery {
                query: &self.query,
                source,
                match_count: self.match_count,
            })
            .send()
            .await
            .map_err(|e| MindsetError::Upstream(e.to_string()))?
            .error_for_status()
            .map_err(|e| MindsetError::Upstream(e.to_string()))?;

        let body: RagResponse = response
            .json()
            .await
            .map_err(|e| MindsetError::Upstream(format!("Invalid RAG response: {}", e)))?;
        Ok(body.results)
    }
}

/// Write one crawled chunk with its `# Source` / `# URL` / `# Chunk` header.
pub fn write_chunk(
    docs_dir: &Path,
    source: &str,
    index: usize,
    url: Option<&str>,
    content: &str,
) -> Result<PathBuf, MindsetError> {
    let path = docs_dir.join(format!("{}_chunk{}.txt", source.replace('.', "_"), index));

    let mut body = format!("# Source: {}\n", source);
    if let Some(url) = url {
        body.push_str(&format!("# URL: {}\n", url));
    }
    body.push_str(&format!("# Chunk: {}\n\n", index));
    body.push_str(content.trim());

    std::fs::write(&path, body)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/rag/perform_rag_query", addr)
    }

    async fn fake_rag(Json(body): Json<Value>) -> axum::response::Response {
        match body["source"].as_str() {
            Some("si.com") => Json(json!({
                "results": [
                    { "content": "Athletes on pressure.", "url": "https://si.com/a" },
                    { "content": "   ", "url": "https://si.com/b" },
                    { "content": "Routines matter." }
                ]
            }))
            .into_response(),
            Some("espn.com") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            _ => Json(json!({ "results": [] })).into_response(),
        }
    }

    #[test]
    fn test_write_chunk_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_chunk(
            dir.path(),
            "bbc.co.uk",
            2,
            Some("https://bbc.co.uk/x"),
            "  body \n",
        )
        .unwrap();

        assert_eq!(path.file_name().unwrap(), "bbc_co_uk_chunk2.txt");
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "# Source: bbc.co.uk\n# URL: https://bbc.co.uk/x\n# Chunk: 2\n\nbody"
        );
    }

    #[test]
    fn test_write_chunk_without_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_chunk(dir.path(), "si.com", 0, None, "text").unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(!text.contains("# URL"));
    }

    #[tokio::test]
    async fn test_run_writes_files_and_tolerates_failures() {
        let endpoint =
            spawn_server(Router::new().route("/rag/perform_rag_query", post(fake_rag))).await;
        let dir = tempfile::tempdir().unwrap();

        let config = IngestConfig {
            docs_dir: dir.path().display().to_string(),
            crawl_endpoint: endpoint,
            crawl_sources: vec!["si.com".into(), "espn.com".into(), "ncaa.com".into()],
            ..Default::default()
        };
        let report = CrawlImporter::from_config(&config).unwrap().run().await.unwrap();

        assert_eq!(report.sources_queried, 3);
        assert_eq!(report.sources_failed, 1);
        assert_eq!(report.files_written, 2);
        assert!(dir.path().join("si_com_chunk0.txt").exists());
        assert!(!dir.path().join("si_com_chunk1.txt").exists());
        assert!(dir.path().join("si_com_chunk2.txt").exists());
    }
}
