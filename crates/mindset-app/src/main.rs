//! Mindset application binary - composition root.
//!
//! Ties the Mindset crates together into a single executable:
//! 1. Load configuration from TOML, then `.env` and the process environment
//! 2. `serve`: open SQLite, connect retrieval, build the chat and speech
//!    services, and run the axum REST API
//! 3. `ingest` / `fetch-crawled`: maintain the reference corpus
//! 4. `chat` / `profile` / `tts`: talk to a running server

mod cli;
mod client;
mod session;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use mindset_api::{start_server, AppState};
use mindset_chat::{
    ChatOrchestrator, ElevenLabsSynthesizer, OpenAiChatModel, SpeechService, SpeechSynthesizer,
    Voice, VoiceCatalog,
};
use mindset_core::config::MindsetConfig;
use mindset_core::types::ProfileAttributes;
use mindset_core::ContextIndex;
use mindset_storage::{Database, HistoryRepository, ProfileRepository};
use mindset_vector::{
    ContextRetriever, CrawlImporter, IngestPipeline, NoContext, OpenAiEmbedding, QdrantStore,
    TextChunker,
};

use crate::cli::{expand_home, CliArgs, Command, ProfileCommand};
use crate::client::ApiClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    // Tracing needs the log level, which may come from the config file, so
    // the file is read before the subscriber exists and reported after.
    let config_path = args.resolve_config_path();
    let loaded = MindsetConfig::load(&config_path);
    let log_level = args
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|c| c.general.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    mindset_core::logging::init_tracing(&log_level);

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) if config_path.exists() => {
            tracing::warn!(
                "Failed to load config from {}: {}. Using defaults.",
                config_path.display(),
                e
            );
            MindsetConfig::default()
        }
        Err(_) => {
            tracing::info!("No config at {}, using defaults", config_path.display());
            MindsetConfig::default()
        }
    };
    config.apply_env();

    match args.command {
        Command::Serve { port, ref host } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            serve(config).await
        }
        Command::Ingest { ref docs_dir } => ingest(&config, docs_dir.as_deref()).await,
        Command::FetchCrawled { ref docs_dir } => fetch_crawled(&config, docs_dir.as_deref()).await,
        Command::Voices => list_voices(&config).await,
        Command::Chat {
            ref user_id,
            no_tts,
        } => {
            let client = api_client(&args, &config)?;
            let user_id = user_id.clone().unwrap_or_else(|| "cli-user".to_string());
            session::run(&client, &user_id, default_voice(&config), !no_tts).await
        }
        Command::Profile { ref action } => {
            let client = api_client(&args, &config)?;
            profile(&client, action).await
        }
        Command::Tts {
            ref text,
            ref voice,
            ref output,
        } => {
            let client = api_client(&args, &config)?;
            let audio = client.tts(text, voice.as_deref()).await?;
            tokio::fs::write(output, &audio)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote {} bytes to {}", audio.len(), output.display());
            Ok(())
        }
    }
}

async fn serve(config: MindsetConfig) -> Result<()> {
    config.validate()?;

    let data_dir = expand_home(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;
    tracing::info!(data_dir = %data_dir.display(), "Data directory ready");

    let db = Arc::new(Database::new(&data_dir.join("mindset.db"))?);
    let profiles = Arc::new(ProfileRepository::new(Arc::clone(&db)));
    let history = Arc::new(HistoryRepository::new(Arc::clone(&db)));

    let context: Arc<dyn ContextIndex> = if config.retrieval.enabled {
        let store = QdrantStore::connect(&config.retrieval)?;
        tracing::info!(
            url = %config.retrieval.qdrant_url,
            collection = store.collection(),
            "Context retrieval enabled"
        );
        let embedder = OpenAiEmbedding::from_config(&config.openai)?;
        Arc::new(ContextRetriever::new(embedder, Arc::new(store)))
    } else {
        tracing::info!("Context retrieval disabled");
        Arc::new(NoContext)
    };

    let model = OpenAiChatModel::from_config(&config.openai)?;
    let chat = ChatOrchestrator::new(profiles.clone(), history, context, Arc::new(model))
        .with_config(&config);

    let synthesizer = ElevenLabsSynthesizer::from_config(&config.speech)?;
    let speech = SpeechService::new(Arc::new(synthesizer), config.speech.default_voice.clone());

    let state = AppState::new(config.clone(), profiles, chat, speech);
    start_server(&config, state).await?;
    Ok(())
}

async fn ingest(config: &MindsetConfig, docs_dir: Option<&Path>) -> Result<()> {
    if config.openai.api_key.trim().is_empty() {
        bail!("openai.api_key is required for ingestion (set OPENAI_API_KEY)");
    }
    let docs_dir = docs_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.ingest.docs_dir));

    let embedder = OpenAiEmbedding::from_config(&config.openai)?;
    let store = QdrantStore::connect(&config.retrieval)?;
    let chunker = TextChunker::new(config.ingest.chunk_size, config.ingest.chunk_overlap);
    let pipeline = IngestPipeline::new(embedder, Arc::new(store), chunker);

    let report = pipeline.ingest_dir(&docs_dir).await?;
    println!(
        "Indexed {} chunks from {} files ({} skipped) into '{}'",
        report.chunks_indexed,
        report.files_found - report.files_skipped,
        report.files_skipped,
        config.retrieval.collection
    );
    Ok(())
}

async fn fetch_crawled(config: &MindsetConfig, docs_dir: Option<&Path>) -> Result<()> {
    let mut ingest = config.ingest.clone();
    if let Some(dir) = docs_dir {
        ingest.docs_dir = dir.display().to_string();
    }

    let report = CrawlImporter::from_config(&ingest)?.run().await?;
    println!(
        "Wrote {} files from {} sources ({} failed) to {}",
        report.files_written, report.sources_queried, report.sources_failed, ingest.docs_dir
    );
    if report.sources_failed == report.sources_queried && report.sources_queried > 0 {
        bail!("every crawl source failed");
    }
    Ok(())
}

async fn list_voices(config: &MindsetConfig) -> Result<()> {
    if config.speech.api_key.trim().is_empty() {
        bail!("speech.api_key is required (set ELEVENLABS_API_KEY)");
    }
    let synthesizer = ElevenLabsSynthesizer::from_config(&config.speech)?;
    let voices = synthesizer.list_voices().await?;

    println!("{} voices available:", voices.len());
    for voice in &voices {
        let labels = voice
            .labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.as_str().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {:<24} {}  [{}]", voice.name, voice.voice_id, labels);
    }
    Ok(())
}

async fn profile(client: &ApiClient, action: &ProfileCommand) -> Result<()> {
    let profile = match action {
        ProfileCommand::Get { user_id } => match client.get_profile(user_id).await? {
            Some(profile) => profile,
            None => {
                println!("No profile for '{}'", user_id);
                return Ok(());
            }
        },
        ProfileCommand::Set {
            user_id,
            sport,
            goals,
            level,
            notes,
        } => {
            let attributes = ProfileAttributes {
                sport: sport.clone(),
                goals: goals.clone(),
                level: level.clone(),
                notes: notes.clone(),
            };
            client.put_profile(user_id, &attributes).await?
        }
    };
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

fn api_client(args: &CliArgs, config: &MindsetConfig) -> Result<ApiClient> {
    let base_url = args.resolve_api_url(&config.server.host, config.server.port);
    ApiClient::new(&base_url, config.server.api_key.clone())
}

fn default_voice(config: &MindsetConfig) -> &'static Voice {
    let catalog = VoiceCatalog;
    catalog
        .resolve(&config.speech.default_voice)
        .unwrap_or(&catalog.all()[0])
}
