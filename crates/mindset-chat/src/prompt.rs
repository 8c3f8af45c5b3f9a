//! Prompt assembly for the sports psychologist persona.
//!
//! A prompt is a system message (persona, profile, reference snippets), the
//! trailing window of prior turns, and the new user message.

use serde::Serialize;

use mindset_core::types::{ConversationTurn, ProfileAttributes, RetrievedSnippet, Role};

/// Fixed instructions for the model.
pub const PERSONA_PREAMBLE: &str = "You are a sports psychologist AI. You help athletes \
with focus, confidence, motivation, pre-competition nerves and recovery from setbacks. \
Be warm and practical, ask a clarifying question when the athlete's situation is unclear, \
and suggest concrete exercises they can try. Use the athlete profile and the reference \
material below when they are relevant; do not invent facts about the athlete.";

/// One message of the rendered conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: &'static str,
    pub content: String,
}

/// Fully assembled prompt for a single completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub history: Vec<(Role, String)>,
    pub user: String,
}

impl Prompt {
    /// Chat-completions style messages: system, history, then the new message.
    pub fn messages(&self) -> Vec<PromptMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(PromptMessage {
            role: "system",
            content: self.system.clone(),
        });
        for (role, content) in &self.history {
            messages.push(PromptMessage {
                role: role.as_str(),
                content: content.clone(),
            });
        }
        messages.push(PromptMessage {
            role: "user",
            content: self.user.clone(),
        });
        messages
    }

    /// The whole prompt as one block of text.
    pub fn render(&self) -> String {
        self.messages()
            .iter()
            .map(|m| format!("[{}]\n{}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Builds prompts from the pieces the orchestrator gathers.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    history_window: usize,
}

impl PromptBuilder {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    pub fn build(
        &self,
        profile: &ProfileAttributes,
        snippets: &[RetrievedSnippet],
        history: &[ConversationTurn],
        message: &str,
    ) -> Prompt {
        let mut system = String::from(PERSONA_PREAMBLE);

        system.push_str("\n\nAthlete profile:\n");
        system.push_str(&serialize_profile(profile));

        if !snippets.is_empty() {
            system.push_str("\n\nReference material:\n");
            for (i, snippet) in snippets.iter().enumerate() {
                system.push_str(&format!("{}. {}\n", i + 1, snippet.content.trim()));
            }
        }

        let start = history.len().saturating_sub(self.history_window);
        let history = history[start..]
            .iter()
            .map(|turn| (turn.role, turn.content.clone()))
            .collect();

        Prompt {
            system: system.trim_end().to_string(),
            history,
            user: message.to_string(),
        }
    }
}

/// `key: value` lines for the attributes that are set, or a placeholder.
pub fn serialize_profile(profile: &ProfileAttributes) -> String {
    if profile.is_empty() {
        return "(no profile on file)".to_string();
    }
    profile
        .fields()
        .iter()
        .filter_map(|(name, value)| value.map(|v| format!("- {}: {}", name, v)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn::now("u1", role, content)
    }

    fn snippet(content: &str) -> RetrievedSnippet {
        RetrievedSnippet {
            content: content.to_string(),
            score: 0.9,
            source: "docs/focus.md".to_string(),
        }
    }

    #[test]
    fn test_empty_profile_placeholder() {
        assert_eq!(
            serialize_profile(&ProfileAttributes::default()),
            "(no profile on file)"
        );
    }

    #[test]
    fn test_profile_lists_only_set_fields() {
        let profile = ProfileAttributes {
            sport: Some("tennis".into()),
            goals: None,
            level: Some("college".into()),
            notes: None,
        };
        assert_eq!(serialize_profile(&profile), "- sport: tennis\n- level: college");
    }

    #[test]
    fn test_build_includes_persona_snippets_and_message() {
        let builder = PromptBuilder::new(20);
        let prompt = builder.build(
            &ProfileAttributes::default(),
            &[snippet("Use a cue word to reset attention.")],
            &[],
            "How can I improve my focus?",
        );

        assert!(prompt.system.starts_with(PERSONA_PREAMBLE));
        assert!(prompt.system.contains("1. Use a cue word to reset attention."));
        assert_eq!(prompt.user, "How can I improve my focus?");

        let rendered = prompt.render();
        assert!(rendered.contains(PERSONA_PREAMBLE));
        assert!(rendered.ends_with("How can I improve my focus?"));
    }

    #[test]
    fn test_no_reference_section_without_snippets() {
        let prompt = PromptBuilder::new(20).build(&ProfileAttributes::default(), &[], &[], "hi");
        assert!(!prompt.system.contains("Reference material"));
    }

    #[test]
    fn test_history_window_keeps_most_recent() {
        let history: Vec<ConversationTurn> = (0..6)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                turn(role, &format!("m{}", i))
            })
            .collect();

        let prompt =
            PromptBuilder::new(4).build(&ProfileAttributes::default(), &[], &history, "next");
        let contents: Vec<&str> = prompt.history.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4", "m5"]);
    }

    #[test]
    fn test_messages_order_and_roles() {
        let history = vec![turn(Role::User, "q"), turn(Role::Assistant, "a")];
        let prompt =
            PromptBuilder::new(20).build(&ProfileAttributes::default(), &[], &history, "new");

        let roles: Vec<&str> = prompt.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }
}
