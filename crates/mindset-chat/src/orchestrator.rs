//! Chat orchestrator: runs one chat turn end to end.
//!
//! Profile, history and context are gathered in sequence, a prompt is built,
//! the language model is called once, and both sides of the exchange are
//! appended to history.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use mindset_core::config::MindsetConfig;
use mindset_core::ports::{ContextIndex, HistoryStore, ProfileStore};
use mindset_core::types::{ConversationTurn, Role};

use crate::error::ChatError;
use crate::llm::LanguageModel;
use crate::prompt::PromptBuilder;

/// Maximum message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Result of a successful turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub response: String,
    /// False when the reply was generated but could not be written to history.
    pub history_recorded: bool,
    pub snippets_used: usize,
}

pub struct ChatOrchestrator {
    profiles: Arc<dyn ProfileStore>,
    history: Arc<dyn HistoryStore>,
    context: Arc<dyn ContextIndex>,
    model: Arc<dyn LanguageModel>,
    prompts: PromptBuilder,
    top_k: usize,
}

impl ChatOrchestrator {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        history: Arc<dyn HistoryStore>,
        context: Arc<dyn ContextIndex>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            profiles,
            history,
            context,
            model,
            prompts: PromptBuilder::new(20),
            top_k: 4,
        }
    }

    /// Apply `retrieval.top_k` and `chat.history_window` from config.
    pub fn with_config(mut self, config: &MindsetConfig) -> Self {
        self.top_k = config.retrieval.top_k;
        self.prompts = PromptBuilder::new(config.chat.history_window);
        self
    }

    pub fn with_limits(mut self, top_k: usize, history_window: usize) -> Self {
        self.top_k = top_k;
        self.prompts = PromptBuilder::new(history_window);
        self
    }

    /// Handle one user message and return the assistant's reply.
    pub async fn handle_turn(&self, user_id: &str, message: &str) -> Result<ChatTurn, ChatError> {
        if user_id.trim().is_empty() {
            return Err(ChatError::EmptyUserId);
        }
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH));
        }

        let profile = self
            .profiles
            .get(user_id)
            .await
            .map_err(|e| ChatError::Storage(e.to_string()))?
            .map(|p| p.attributes)
            .unwrap_or_default();

        let history = self
            .history
            .list(user_id)
            .await
            .map_err(|e| ChatError::Storage(e.to_string()))?;

        let snippets = match self.context.search(message, self.top_k).await {
            Ok(snippets) => snippets,
            Err(e) => {
                warn!(user_id, error = %e, "Context retrieval failed; continuing without context");
                Vec::new()
            }
        };
        if snippets.is_empty() {
            debug!(user_id, "No context snippets for this turn");
        }

        let prompt = self.prompts.build(&profile, &snippets, &history, message);
        let response = self.model.complete(&prompt).await?;

        let history_recorded = self.record(user_id, message, &response).await;

        info!(
            user_id,
            history_len = history.len(),
            snippets = snippets.len(),
            history_recorded,
            "Chat turn complete"
        );

        Ok(ChatTurn {
            response,
            history_recorded,
            snippets_used: snippets.len(),
        })
    }

    async fn record(&self, user_id: &str, message: &str, response: &str) -> bool {
        let user_turn = ConversationTurn::now(user_id, Role::User, message);
        if let Err(e) = self.history.append(&user_turn).await {
            error!(user_id, error = %e, "Failed to record user message; reply not persisted");
            return false;
        }

        let reply = ConversationTurn::now(user_id, Role::Assistant, response);
        if let Err(e) = self.history.append(&reply).await {
            error!(user_id, error = %e, "Failed to record assistant reply");
            return false;
        }

        true
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use mindset_core::error::{MindsetError, Result as CoreResult};
    use mindset_core::types::{ProfileAttributes, RetrievedSnippet, UserProfile};
    use mindset_storage::{Database, HistoryRepository, ProfileRepository};

    use crate::prompt::{Prompt, PERSONA_PREAMBLE};

    // -- fakes ---------------------------------------------------------------

    #[derive(Default)]
    struct FakeContext {
        queries: Mutex<Vec<String>>,
        snippets: Vec<RetrievedSnippet>,
        fail: bool,
    }

    #[async_trait]
    impl ContextIndex for FakeContext {
        async fn search(&self, query: &str, limit: usize) -> CoreResult<Vec<RetrievedSnippet>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(MindsetError::Retrieval("qdrant unreachable".into()));
            }
            Ok(self.snippets.iter().take(limit).cloned().collect())
        }
    }

    struct FakeModel {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl FakeModel {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                reply: Err(msg.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn complete(&self, prompt: &Prompt) -> std::result::Result<String, ChatError> {
            self.prompts.lock().unwrap().push(prompt.clone());
            self.reply.clone().map_err(ChatError::Upstream)
        }
    }

    struct BrokenHistory;

    #[async_trait]
    impl HistoryStore for BrokenHistory {
        async fn append(&self, _turn: &ConversationTurn) -> CoreResult<()> {
            Err(MindsetError::Storage("disk full".into()))
        }
        async fn list(&self, _user_id: &str) -> CoreResult<Vec<ConversationTurn>> {
            Ok(Vec::new())
        }
    }

    struct UnreadableProfiles;

    #[async_trait]
    impl ProfileStore for UnreadableProfiles {
        async fn get(&self, _user_id: &str) -> CoreResult<Option<UserProfile>> {
            Err(MindsetError::Storage("database locked".into()))
        }
        async fn put(&self, _user_id: &str, _a: ProfileAttributes) -> CoreResult<UserProfile> {
            Err(MindsetError::Storage("database locked".into()))
        }
    }

    // -- harness -------------------------------------------------------------

    struct Harness {
        profiles: Arc<ProfileRepository>,
        history: Arc<HistoryRepository>,
        context: Arc<FakeContext>,
        model: Arc<FakeModel>,
    }

    impl Harness {
        fn new(context: FakeContext, model: FakeModel) -> Self {
            let db = Arc::new(Database::in_memory().unwrap());
            Self {
                profiles: Arc::new(ProfileRepository::new(db.clone())),
                history: Arc::new(HistoryRepository::new(db)),
                context: Arc::new(context),
                model: Arc::new(model),
            }
        }

        fn orchestrator(&self) -> ChatOrchestrator {
            ChatOrchestrator::new(
                self.profiles.clone(),
                self.history.clone(),
                self.context.clone(),
                self.model.clone(),
            )
        }
    }

    fn snippet(content: &str, score: f32) -> RetrievedSnippet {
        RetrievedSnippet {
            content: content.to_string(),
            score,
            source: "docs/focus.md".to_string(),
        }
    }

    // -- tests ---------------------------------------------------------------

    #[tokio::test]
    async fn test_first_turn_for_new_user() {
        let h = Harness::new(FakeContext::default(), FakeModel::replying("Try a cue word."));
        let turn = h
            .orchestrator()
            .handle_turn("u1", "How can I improve my focus?")
            .await
            .unwrap();

        assert_eq!(turn.response, "Try a cue word.");
        assert!(turn.history_recorded);
        assert_eq!(
            *h.context.queries.lock().unwrap(),
            vec!["How can I improve my focus?".to_string()]
        );

        let prompts = h.model.prompts.lock().unwrap();
        let rendered = prompts[0].render();
        assert!(rendered.contains(PERSONA_PREAMBLE));
        assert!(rendered.contains("How can I improve my focus?"));

        let stored = h.history.find_by_user("u1").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, Role::User);
        assert_eq!(stored[0].content, "How can I improve my focus?");
        assert_eq!(stored[1].role, Role::Assistant);
        assert_eq!(stored[1].content, "Try a cue word.");
    }

    #[tokio::test]
    async fn test_n_turns_leave_two_n_alternating_entries() {
        let h = Harness::new(FakeContext::default(), FakeModel::replying("ok"));
        let orchestrator = h.orchestrator();
        for i in 0..3 {
            orchestrator
                .handle_turn("u1", &format!("message {}", i))
                .await
                .unwrap();
        }

        let stored = h.history.find_by_user("u1").unwrap();
        assert_eq!(stored.len(), 6);
        for (i, turn) in stored.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role, expected);
        }
        assert!(stored.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        // Third prompt carries the first two exchanges.
        let prompts = h.model.prompts.lock().unwrap();
        assert_eq!(prompts[2].history.len(), 4);
    }

    #[tokio::test]
    async fn test_profile_and_snippets_reach_prompt() {
        let context = FakeContext {
            snippets: vec![snippet("Box breathing lowers arousal.", 0.8)],
            ..Default::default()
        };
        let h = Harness::new(context, FakeModel::replying("ok"));
        h.profiles
            .upsert(
                "u1",
                ProfileAttributes {
                    sport: Some("tennis".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let turn = h.orchestrator().handle_turn("u1", "nerves").await.unwrap();
        assert_eq!(turn.snippets_used, 1);

        let system = h.model.prompts.lock().unwrap()[0].system.clone();
        assert!(system.contains("- sport: tennis"));
        assert!(system.contains("Box breathing lowers arousal."));
    }

    #[tokio::test]
    async fn test_history_window_limits_prompt() {
        let h = Harness::new(FakeContext::default(), FakeModel::replying("ok"));
        let orchestrator = h.orchestrator().with_limits(4, 2);
        orchestrator.handle_turn("u1", "one").await.unwrap();
        orchestrator.handle_turn("u1", "two").await.unwrap();
        orchestrator.handle_turn("u1", "three").await.unwrap();

        let prompts = h.model.prompts.lock().unwrap();
        let contents: Vec<&str> = prompts[2].history.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(contents, vec!["two", "ok"]);
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades_to_empty_context() {
        let context = FakeContext {
            fail: true,
            ..Default::default()
        };
        let h = Harness::new(context, FakeModel::replying("still here"));

        let turn = h.orchestrator().handle_turn("u1", "hello").await.unwrap();
        assert_eq!(turn.response, "still here");
        assert_eq!(turn.snippets_used, 0);
        assert_eq!(h.history.count_by_user("u1").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_model_failure_is_upstream_and_writes_nothing() {
        let h = Harness::new(FakeContext::default(), FakeModel::failing("HTTP 503"));

        let err = h.orchestrator().handle_turn("u1", "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Upstream(_)));
        assert_eq!(h.history.count_by_user("u1").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history_write_failure_still_returns_reply() {
        let db = Arc::new(Database::in_memory().unwrap());
        let orchestrator = ChatOrchestrator::new(
            Arc::new(ProfileRepository::new(db)),
            Arc::new(BrokenHistory),
            Arc::new(FakeContext::default()),
            Arc::new(FakeModel::replying("reply")),
        );

        let turn = orchestrator.handle_turn("u1", "hello").await.unwrap();
        assert_eq!(turn.response, "reply");
        assert!(!turn.history_recorded);
    }

    #[tokio::test]
    async fn test_profile_read_failure_aborts_before_model() {
        let db = Arc::new(Database::in_memory().unwrap());
        let model = Arc::new(FakeModel::replying("never"));
        let orchestrator = ChatOrchestrator::new(
            Arc::new(UnreadableProfiles),
            Arc::new(HistoryRepository::new(db)),
            Arc::new(FakeContext::default()),
            model.clone(),
        );

        let err = orchestrator.handle_turn("u1", "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Storage(_)));
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_call() {
        let h = Harness::new(FakeContext::default(), FakeModel::replying("x"));
        let orchestrator = h.orchestrator();

        assert!(matches!(
            orchestrator.handle_turn("u1", "   ").await,
            Err(ChatError::EmptyMessage)
        ));
        assert!(matches!(
            orchestrator.handle_turn("", "hello").await,
            Err(ChatError::EmptyUserId)
        ));
        let long = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(matches!(
            orchestrator.handle_turn("u1", &long).await,
            Err(ChatError::MessageTooLong(MAX_MESSAGE_LENGTH))
        ));

        assert!(h.context.queries.lock().unwrap().is_empty());
        assert!(h.model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_users_do_not_share_history() {
        let h = Harness::new(FakeContext::default(), FakeModel::replying("ok"));
        let orchestrator = h.orchestrator();
        orchestrator.handle_turn("u1", "mine").await.unwrap();
        orchestrator.handle_turn("u2", "theirs").await.unwrap();

        let prompts = h.model.prompts.lock().unwrap();
        assert!(prompts[1].history.is_empty());
        assert_eq!(h.history.count_by_user("u2").unwrap(), 2);
    }
}
