//! HTTP client for a running Mindset server, used by the client commands.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use mindset_core::types::{ProfileAttributes, UserProfile};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    user_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub history_recorded: bool,
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub async fn chat(&self, user_id: &str, message: &str) -> Result<ChatReply> {
        let request = self
            .client
            .post(self.url("/chat"))
            .json(&ChatRequest { user_id, message });
        let response = self.send(request).await?;
        response.json().await.context("Invalid chat response")
    }

    /// `None` when the server has no profile for `user_id`.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let request = self
            .client
            .get(self.url("/profile"))
            .query(&[("user_id", user_id)]);
        let response = self.authorize(request).send().await.context("Request failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(response.json().await.context("Invalid profile response")?))
    }

    pub async fn put_profile(
        &self,
        user_id: &str,
        attributes: &ProfileAttributes,
    ) -> Result<UserProfile> {
        let request = self
            .client
            .put(self.url("/profile"))
            .query(&[("user_id", user_id)])
            .json(attributes);
        let response = self.send(request).await?;
        response.json().await.context("Invalid profile response")
    }

    /// MP3 bytes for `text`, spoken by `voice` (catalog id or name).
    pub async fn tts(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>> {
        let request = self.client.post(self.url("/tts")).json(&TtsRequest {
            text,
            voice_id: voice,
        });
        let response = self.send(request).await?;
        let bytes = response.bytes().await.context("Failed to read audio")?;
        Ok(bytes.to_vec())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .with_context(|| format!("Could not reach {}", self.base_url))?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => Err(anyhow!("{} ({}): {}", status, body.error, body.message)),
        Err(_) => Err(anyhow!("{}: {}", status, text)),
    }
}
