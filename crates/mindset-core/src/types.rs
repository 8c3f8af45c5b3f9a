use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Message typed by the athlete.
    User,
    /// Reply generated by the language model.
    Assistant,
}

impl Role {
    /// Stored / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

// =============================================================================
// Profiles
// =============================================================================

/// Free-form coaching attributes for one athlete.
///
/// Every field is optional; a profile write replaces the whole set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAttributes {
    pub sport: Option<String>,
    pub goals: Option<String>,
    /// Skill level, e.g. "amateur" or "collegiate".
    pub level: Option<String>,
    pub notes: Option<String>,
}

impl ProfileAttributes {
    /// True when no attribute carries a value.
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_none())
    }

    /// Attribute name/value pairs in a stable order.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("sport", self.sport.as_deref()),
            ("goals", self.goals.as_deref()),
            ("level", self.level.as_deref()),
            ("notes", self.notes.as_deref()),
        ]
    }
}

/// A stored user profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque identifier issued by the external auth system.
    pub id: String,
    #[serde(flatten)]
    pub attributes: ProfileAttributes,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Conversation
// =============================================================================

/// One persisted message in a user's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Build a turn stamped with the current time.
    pub fn now(user_id: &str, role: Role, content: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Retrieval
// =============================================================================

/// A passage of reference text returned by the similarity index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSnippet {
    pub content: String,
    /// Similarity to the query; higher is closer.
    pub score: f32,
    /// Where the passage came from (file path or URL).
    pub source: String,
}
