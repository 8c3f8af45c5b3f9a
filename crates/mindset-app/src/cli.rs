//! CLI argument definitions for the Mindset binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mindset - a sports psychologist chat backend.
#[derive(Parser, Debug)]
#[command(name = "mindset", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Base URL of a running server, for the client commands.
    #[arg(long = "api-url", env = "MINDSET_API_URL", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server.
    Serve {
        /// Port to listen on (overrides config and MINDSET_PORT).
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
        /// Address to bind.
        #[arg(long = "host")]
        host: Option<String>,
    },
    /// Chunk, embed and index every .md/.txt file under the docs directory.
    Ingest {
        #[arg(long = "docs-dir")]
        docs_dir: Option<PathBuf>,
    },
    /// Pull crawled articles from the RAG endpoint into the docs directory.
    FetchCrawled {
        #[arg(long = "docs-dir")]
        docs_dir: Option<PathBuf>,
    },
    /// List the voices on the speech provider account.
    Voices,
    /// Interactive chat against a running server. Type /exit to quit.
    Chat {
        #[arg(short = 'u', long = "user-id")]
        user_id: Option<String>,
        /// Skip synthesizing each reply to an mp3 file.
        #[arg(long = "no-tts")]
        no_tts: bool,
    },
    /// Read or write a user profile on a running server.
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Synthesize one piece of text to an mp3 file.
    Tts {
        text: String,
        /// Catalog voice id or name.
        #[arg(short = 'v', long = "voice")]
        voice: Option<String>,
        #[arg(short = 'o', long = "output", default_value = "tts_output.mp3")]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    Get {
        user_id: String,
    },
    /// Replace the whole profile; omitted attributes are cleared.
    Set {
        user_id: String,
        #[arg(long)]
        sport: Option<String>,
        #[arg(long)]
        goals: Option<String>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MINDSET_CONFIG env var > ~/.mindset/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(|key| std::env::var(key).ok())
    }

    fn resolve_config_path_with<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = lookup("MINDSET_CONFIG").filter(|p| !p.trim().is_empty()) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Base URL for the client commands, falling back to the configured
    /// server address.
    pub fn resolve_api_url(&self, host: &str, port: u16) -> String {
        match self.api_url {
            Some(ref url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", host, port),
        }
    }
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    std::env::var(var).ok().map(PathBuf::from)
}

fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".mindset").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}
