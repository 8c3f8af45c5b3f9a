use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MindsetError, Result};

/// Top-level configuration for the Mindset backend.
///
/// Loaded from `~/.mindset/config.toml` by default, then overlaid with
/// environment variables (see [`MindsetConfig::apply_env_overrides`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MindsetConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl MindsetConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MindsetConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay secrets and endpoints from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`, which maps variable names to values.
    ///
    /// Empty values are ignored so a blank line in `.env` does not wipe a
    /// key set in the config file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai.api_key = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = get("ELEVENLABS_API_KEY") {
            self.speech.api_key = v;
        }
        if let Some(v) = get("QDRANT_URL") {
            self.retrieval.qdrant_url = v;
        }
        if let Some(v) = get("QDRANT_API_KEY") {
            self.retrieval.qdrant_api_key = Some(v);
        }
        if let Some(v) = get("MINDSET_API_KEY") {
            self.server.api_key = Some(v);
        }
        if let Some(v) = get("MINDSET_PORT") {
            match v.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %v, "Ignoring invalid MINDSET_PORT"),
            }
        }
        if let Some(v) = get("MINDSET_DATA_DIR") {
            self.general.data_dir = v;
        }
    }

    /// Check the settings the server cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.openai.api_key.trim().is_empty() {
            return Err(MindsetError::Config(
                "openai.api_key is required (set OPENAI_API_KEY)".to_string(),
            ));
        }
        if self.speech.api_key.trim().is_empty() {
            warn!("speech.api_key is not set; /tts requests will fail upstream");
        }
        if self.retrieval.top_k == 0 {
            return Err(MindsetError::Config(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(MindsetError::Config(format!(
                "ingest.chunk_overlap ({}) must be smaller than ingest.chunk_size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.mindset/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// When set, every route except `/health` requires `Authorization: Bearer <key>`.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            api_key: None,
        }
    }
}

/// Language model and embedding provider (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Dimension of vectors produced by `embedding_model`.
    pub embedding_dim: usize,
    pub temperature: f32,
    pub http_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dim: 1536,
            temperature: 0.7,
            http_timeout_secs: 60,
        }
    }
}

/// External similarity index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Disable to run chat turns without any knowledge-base context.
    pub enabled: bool,
    /// Qdrant gRPC endpoint.
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    /// Snippets fetched per chat turn.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_api_key: None,
            collection: "sports_psychology_docs".to_string(),
            top_k: 4,
        }
    }
}

/// Text-to-speech provider settings (ElevenLabs API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_id: String,
    /// Voice used when a request does not name one.
    pub default_voice: String,
    pub output_format: String,
    pub http_timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.elevenlabs.io".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            default_voice: "EXAVITQu4vr4xnSDxMaL".to_string(),
            output_format: "mp3_44100_128".to_string(),
            http_timeout_secs: 60,
        }
    }
}

/// Chat pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Most recent history entries included in the prompt.
    pub history_window: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { history_window: 20 }
    }
}

/// Offline ingestion and crawl import settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub docs_dir: String,
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// RAG query endpoint used by `fetch-crawled`.
    pub crawl_endpoint: String,
    pub crawl_query: String,
    pub crawl_match_count: usize,
    pub crawl_sources: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            docs_dir: "docs".to_string(),
            chunk_size: 800,
            chunk_overlap: 200,
            crawl_endpoint: "http://localhost:8051/rag/perform_rag_query".to_string(),
            crawl_query: "sports psychology OR athlete interview OR mental health".to_string(),
            crawl_match_count: 20,
            crawl_sources: [
                "si.com",
                "olympics.com",
                "bbc.com",
                "bbc.co.uk",
                "verywellmind.com",
                "espn.com",
                "theguardian.com",
                "nytimes.com",
                "psychologytoday.com",
                "ncaa.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn create_temp_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn valid_config() -> MindsetConfig {
        let mut config = MindsetConfig::default();
        config.openai.api_key = "sk-test".to_string();
        config
    }

    #[test]
    fn test_config_default_values() {
        let config = MindsetConfig::default();

        assert_eq!(config.general.data_dir, "~/.mindset/data");
        assert_eq!(config.general.log_level, "info");

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert!(config.server.api_key.is_none());

        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.openai.embedding_model, "text-embedding-3-small");
        assert_eq!(config.openai.embedding_dim, 1536);

        assert!(config.retrieval.enabled);
        assert_eq!(config.retrieval.collection, "sports_psychology_docs");
        assert_eq!(config.retrieval.top_k, 4);

        assert_eq!(config.speech.default_voice, "EXAVITQu4vr4xnSDxMaL");
        assert_eq!(config.chat.history_window, 20);

        assert_eq!(config.ingest.chunk_size, 800);
        assert_eq!(config.ingest.chunk_overlap, 200);
        assert_eq!(config.ingest.crawl_sources.len(), 10);
    }

    #[test]
    fn test_config_partial_toml_fills_defaults() {
        let content = r#"
[server]
port = 9100

[retrieval]
top_k = 8
collection = "custom"
"#;
        let file = create_temp_config(content);
        let config = MindsetConfig::load(file.path()).unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.collection, "custom");
        assert_eq!(config.openai.chat_model, "gpt-4o-mini");
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = MindsetConfig::load(file.path());
        assert!(matches!(result, Err(MindsetError::Config(_))));
    }

    #[test]
    fn test_config_load_or_default_missing_file() {
        let config = MindsetConfig::load_or_default(Path::new("/does/not/exist/config.toml"));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_config_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = MindsetConfig::default();
        config.chat.history_window = 6;
        config.save(&path).unwrap();

        let reloaded = MindsetConfig::load(&path).unwrap();
        assert_eq!(reloaded.chat.history_window, 6);
    }

    #[test]
    fn test_env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("OPENAI_API_KEY", "sk-env"),
            ("ELEVENLABS_API_KEY", "xi-env"),
            ("QDRANT_URL", "http://qdrant:6334"),
            ("MINDSET_API_KEY", "secret"),
            ("MINDSET_PORT", "9000"),
        ]
        .into_iter()
        .collect();

        let mut config = MindsetConfig::default();
        config.apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.openai.api_key, "sk-env");
        assert_eq!(config.speech.api_key, "xi-env");
        assert_eq!(config.retrieval.qdrant_url, "http://qdrant:6334");
        assert_eq!(config.server.api_key.as_deref(), Some("secret"));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_env_overrides_skip_blank_and_invalid() {
        let mut config = MindsetConfig::default();
        config.openai.api_key = "from-file".to_string();
        config.apply_env_overrides(|k| match k {
            "OPENAI_API_KEY" => Some("   ".to_string()),
            "MINDSET_PORT" => Some("not-a-port".to_string()),
            _ => None,
        });

        assert_eq!(config.openai.api_key, "from-file");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_validate_requires_openai_key() {
        let config = MindsetConfig::default();
        assert!(matches!(config.validate(), Err(MindsetError::Config(_))));
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_size() {
        let mut config = valid_config();
        config.ingest.chunk_overlap = config.ingest.chunk_size;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = valid_config();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }
}
