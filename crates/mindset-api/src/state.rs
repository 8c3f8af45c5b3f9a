//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use mindset_chat::{ChatOrchestrator, SpeechService};
use mindset_core::config::MindsetConfig;
use mindset_core::ports::ProfileStore;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MindsetConfig>,
    pub profiles: Arc<dyn ProfileStore>,
    pub chat: Arc<ChatOrchestrator>,
    pub speech: Arc<SpeechService>,
    /// Bearer key required on protected routes; `None` disables the guard.
    pub api_key: Option<String>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: MindsetConfig,
        profiles: Arc<dyn ProfileStore>,
        chat: ChatOrchestrator,
        speech: SpeechService,
    ) -> Self {
        let api_key = config
            .server
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty());
        Self {
            config: Arc::new(config),
            profiles,
            chat: Arc::new(chat),
            speech: Arc::new(speech),
            api_key,
            start_time: Instant::now(),
        }
    }
}
