use thiserror::Error;

/// Top-level error type for the Mindset backend.
///
/// Subsystem crates define their own error types where they need finer
/// detail and convert into or out of `MindsetError` so that `?` works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MindsetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for MindsetError {
    fn from(err: toml::de::Error) -> Self {
        MindsetError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MindsetError {
    fn from(err: toml::ser::Error) -> Self {
        MindsetError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MindsetError {
    fn from(err: serde_json::Error) -> Self {
        MindsetError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Mindset operations.
pub type Result<T> = std::result::Result<T, MindsetError>;
