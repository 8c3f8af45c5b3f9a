//! Error types for the chat pipeline and speech synthesis.

use mindset_core::error::MindsetError;

/// Errors from the chat engine and the speech synthesizer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("user_id cannot be empty")]
    EmptyUserId,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("text cannot be empty")]
    EmptyText,
    #[error("unknown voice: {0}")]
    UnknownVoice(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl ChatError {
    /// True for errors caused by the caller's input rather than a dependency.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ChatError::EmptyUserId
                | ChatError::EmptyMessage
                | ChatError::MessageTooLong(_)
                | ChatError::EmptyText
                | ChatError::UnknownVoice(_)
        )
    }
}

impl From<MindsetError> for ChatError {
    fn from(err: MindsetError) -> Self {
        match err {
            MindsetError::Upstream(msg) => ChatError::Upstream(msg),
            other => ChatError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(4000).to_string(),
            "message exceeds maximum length of 4000 characters"
        );
        assert_eq!(
            ChatError::UnknownVoice("Bob".into()).to_string(),
            "unknown voice: Bob"
        );
        assert_eq!(
            ChatError::Upstream("HTTP 500".into()).to_string(),
            "upstream error: HTTP 500"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(ChatError::EmptyUserId.is_validation());
        assert!(ChatError::EmptyText.is_validation());
        assert!(ChatError::UnknownVoice("x".into()).is_validation());
        assert!(!ChatError::Upstream("x".into()).is_validation());
        assert!(!ChatError::Storage("x".into()).is_validation());
    }

    #[test]
    fn test_from_mindset_error() {
        let err: ChatError = MindsetError::Storage("disk full".into()).into();
        assert!(matches!(err, ChatError::Storage(ref m) if m.contains("disk full")));

        let err: ChatError = MindsetError::Upstream("timeout".into()).into();
        assert!(matches!(err, ChatError::Upstream(_)));
    }
}
