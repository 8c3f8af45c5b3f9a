//! Port interfaces for the external stores the chat pipeline talks to.
//!
//! The orchestrator only sees these traits. Production wires in the SQLite
//! repositories and the Qdrant retriever; tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ConversationTurn, ProfileAttributes, RetrievedSnippet, UserProfile};

/// Read/replace access to user profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile for `user_id`, or `None` when none was ever written.
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Replace the full attribute set for `user_id`, creating the row if needed.
    async fn put(&self, user_id: &str, attributes: ProfileAttributes) -> Result<UserProfile>;
}

/// Append/read access to conversation history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a single turn.
    async fn append(&self, turn: &ConversationTurn) -> Result<()>;

    /// All turns for `user_id`, oldest first.
    async fn list(&self, user_id: &str) -> Result<Vec<ConversationTurn>>;
}

/// Similarity search over the knowledge base.
#[async_trait]
pub trait ContextIndex: Send + Sync {
    /// Up to `limit` snippets ordered by descending score. An empty vector is
    /// a normal outcome.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedSnippet>>;
}
