//! Mindset API crate - axum HTTP server and route handlers.
//!
//! Exposes chat turns, profile read/write, text-to-speech, the voice
//! catalog and a health check over JSON/HTTP.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
