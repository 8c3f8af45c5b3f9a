//! Speech synthesis: the voice catalog, the synthesizer port, and the
//! ElevenLabs client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mindset_core::config::SpeechConfig;

use crate::error::ChatError;

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    American,
    Australian,
    British,
    Swedish,
}

/// A named voice offered to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub id: &'static str,
    pub name: &'static str,
    pub gender: Gender,
    pub accent: Accent,
}

const VOICES: &[Voice] = &[
    Voice {
        id: "IKne3meq5aSn9XLyUdCD",
        name: "Charlie",
        gender: Gender::Male,
        accent: Accent::Australian,
    },
    Voice {
        id: "EXAVITQu4vr4xnSDxMaL",
        name: "Sarah",
        gender: Gender::Female,
        accent: Accent::American,
    },
    Voice {
        id: "JBFqnCBsd6RMkjVDRZzb",
        name: "George",
        gender: Gender::Male,
        accent: Accent::British,
    },
    Voice {
        id: "Xb7hH8MSUJpSbSDYk0k2",
        name: "Alice",
        gender: Gender::Female,
        accent: Accent::British,
    },
    Voice {
        id: "cjVigY5qzO86Huf0OWal",
        name: "Eric",
        gender: Gender::Male,
        accent: Accent::American,
    },
    Voice {
        id: "XB0fDUnXU5powFXDhCwa",
        name: "Charlotte",
        gender: Gender::Female,
        accent: Accent::Swedish,
    },
];

/// The fixed set of voices this service will synthesize with.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceCatalog;

impl VoiceCatalog {
    pub fn all(&self) -> &'static [Voice] {
        VOICES
    }

    /// Look a voice up by id (exact) or name (case-insensitive).
    pub fn resolve(&self, selector: &str) -> Option<&'static Voice> {
        let selector = selector.trim();
        VOICES
            .iter()
            .find(|v| v.id == selector)
            .or_else(|| VOICES.iter().find(|v| v.name.eq_ignore_ascii_case(selector)))
    }

    pub fn by_traits(&self, gender: Gender, accent: Accent) -> Option<&'static Voice> {
        VOICES.iter().find(|v| v.gender == gender && v.accent == accent)
    }

    /// Gender and accent words mentioned in free text, e.g. "use a british
    /// male voice". "female" is checked before "male" since it contains it.
    pub fn detect_traits(message: &str) -> (Option<Gender>, Option<Accent>) {
        let lower = message.to_lowercase();

        let gender = if lower.contains("female") {
            Some(Gender::Female)
        } else if lower.contains("male") {
            Some(Gender::Male)
        } else {
            None
        };

        let accent = [
            ("australian", Accent::Australian),
            ("british", Accent::British),
            ("american", Accent::American),
            ("swedish", Accent::Swedish),
        ]
        .into_iter()
        .find(|(word, _)| lower.contains(word))
        .map(|(_, accent)| accent);

        (gender, accent)
    }
}

// =============================================================================
// Synthesizer port
// =============================================================================

/// A voice as reported by the speech provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderVoice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub labels: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Converts text to encoded audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// MP3 bytes for `text` spoken by the provider voice `voice_id`.
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, ChatError>;

    /// Voices available on the provider account.
    async fn list_voices(&self) -> Result<Vec<ProviderVoice>, ChatError>;
}

/// Synthesized audio and the voice that produced it.
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub voice: &'static Voice,
    pub audio: Vec<u8>,
}

/// Validates TTS requests against the catalog before calling the provider.
pub struct SpeechService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    catalog: VoiceCatalog,
    default_voice: String,
}

impl SpeechService {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, default_voice: impl Into<String>) -> Self {
        Self {
            synthesizer,
            catalog: VoiceCatalog,
            default_voice: default_voice.into(),
        }
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    pub fn synthesizer(&self) -> &Arc<dyn SpeechSynthesizer> {
        &self.synthesizer
    }

    /// Synthesize `text` with `voice`, or the default voice when `None`.
    ///
    /// Unknown voices are rejected before any provider call.
    pub async fn speak(&self, text: &str, voice: Option<&str>) -> Result<SpeechAudio, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyText);
        }

        // Only an absent selector falls back; a blank one is unknown.
        let selector = voice.unwrap_or(&self.default_voice);
        let voice = self
            .catalog
            .resolve(selector)
            .ok_or_else(|| ChatError::UnknownVoice(selector.to_string()))?;

        debug!(voice = voice.name, chars = text.len(), "Synthesizing speech");
        let audio = self.synthesizer.synthesize(text, voice.id).await?;
        if audio.is_empty() {
            return Err(ChatError::Upstream("speech provider returned no audio".to_string()));
        }

        Ok(SpeechAudio { voice, audio })
    }
}

// =============================================================================
// ElevenLabs
// =============================================================================

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<ProviderVoice>,
}

/// Client for the ElevenLabs text-to-speech API.
#[derive(Debug, Clone)]
pub struct ElevenLabsSynthesizer {
    client: Client,
    api_key: String,
    base_url: String,
    model_id: String,
    output_format: String,
}

impl ElevenLabsSynthesizer {
    pub fn new(api_key: String, base_url: String, model_id: String, output_format: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_id,
            output_format,
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| ChatError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model_id: config.model_id.clone(),
            output_format: config.output_format.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, ChatError> {
        let response = self
            .client
            .post(format!("{}/v1/text-to-speech/{}", self.base_url, voice_id))
            .query(&[("output_format", self.output_format.as_str())])
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&TtsRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| ChatError::Upstream(format!("TTS request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream(format!("TTS returned {}: {}", status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChatError::Upstream(format!("Failed to read TTS audio: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn list_voices(&self) -> Result<Vec<ProviderVoice>, ChatError> {
        let response = self
            .client
            .get(format!("{}/v1/voices", self.base_url))
            .header("xi-api-key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ChatError::Upstream(format!("Voice listing failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream(format!(
                "Voice listing returned {}: {}",
                status, body
            )));
        }

        let parsed: VoicesResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Upstream(format!("Invalid voice listing: {}", e)))?;
        Ok(parsed.voices)
    }
}

// =============================================================================
// Tests
// =============================================================================
