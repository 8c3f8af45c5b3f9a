pub mod config;
pub mod error;
pub mod logging;
pub mod ports;
pub mod types;

pub use config::MindsetConfig;
pub use error::{MindsetError, Result};
pub use ports::{ContextIndex, HistoryStore, ProfileStore};
pub use types::*;
