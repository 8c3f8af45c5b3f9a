//! Language model port and the OpenAI chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mindset_core::config::OpenAiConfig;

use crate::error::ChatError;
use crate::prompt::{Prompt, PromptMessage};

/// Produces a completion for an assembled prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Non-empty completion text, or `ChatError::Upstream`.
    async fn complete(&self, prompt: &Prompt) -> Result<String, ChatError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<PromptMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(api_key: String, base_url: String, model: String, temperature: f32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
        }
    }

    pub fn from_config(config: &OpenAiConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| ChatError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.chat_model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String, ChatError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: prompt.messages(),
            temperature: self.temperature,
        };

        debug!(model = %self.model, messages = request.messages.len(), "Requesting completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Upstream(format!("LLM request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Upstream(format!("Failed to read LLM response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ChatError::Upstream(format!(
                "LLM returned {}: {}",
                status, message
            )));
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::Upstream(format!("Invalid LLM response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ChatError::Upstream("LLM returned an empty completion".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use mindset_core::types::Role;

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "persona".into(),
            history: vec![(Role::User, "earlier".into())],
            user: "How can I improve my focus?".into(),
        }
    }

    #[tokio::test]
    async fn test_complete_sends_messages_and_returns_text() {
        let app = Router::new().route(
            "/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(body["model"], "gpt-4o-mini");
                let messages = body["messages"].as_array().unwrap();
                assert_eq!(messages.len(), 3);
                assert_eq!(messages[0]["role"], "system");
                assert_eq!(messages[2]["content"], "How can I improve my focus?");
                Json(json!({
                    "choices": [{
                        "message": { "role": "assistant", "content": "Try a cue word." }
                    }]
                }))
            }),
        );
        let base = spawn_server(app).await;
        let model = OpenAiChatModel::new("sk-test".into(), base, "gpt-4o-mini".into(), 0.7);

        assert_eq!(model.complete(&prompt()).await.unwrap(), "Try a cue word.");
    }

    #[tokio::test]
    async fn test_completion_text_is_returned_unmodified() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async {
                Json(json!({ "choices": [{ "message": { "content": "  Line one.\n\n" } }] }))
            }),
        );
        let base = spawn_server(app).await;
        let model = OpenAiChatModel::new("k".into(), base, "m".into(), 0.7);

        assert_eq!(model.complete(&prompt()).await.unwrap(), "  Line one.\n\n");
    }

    #[tokio::test]
    async fn test_empty_completion_is_upstream_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({ "choices": [{ "message": { "content": "  " } }] })) }),
        );
        let base = spawn_server(app).await;
        let model = OpenAiChatModel::new("k".into(), base, "m".into(), 0.7);

        assert!(matches!(
            model.complete(&prompt()).await,
            Err(ChatError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": { "message": "rate limited" } })),
                )
            }),
        );
        let base = spawn_server(app).await;
        let model = OpenAiChatModel::new("k".into(), base, "m".into(), 0.7);

        match model.complete(&prompt()).await {
            Err(ChatError::Upstream(msg)) => assert!(msg.contains("rate limited")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_upstream_error() {
        let model =
            OpenAiChatModel::new("k".into(), "http://127.0.0.1:9".into(), "m".into(), 0.7);
        assert!(matches!(
            model.complete(&prompt()).await,
            Err(ChatError::Upstream(_))
        ));
    }
}
