//! Conversational core for the sports psychologist backend.
//!
//! Provides prompt assembly, the language model client, the chat turn
//! orchestrator, and speech synthesis with the voice catalog.

pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod voice;

pub use error::ChatError;
pub use llm::{LanguageModel, OpenAiChatModel};
pub use orchestrator::{ChatOrchestrator, ChatTurn, MAX_MESSAGE_LENGTH};
pub use prompt::{Prompt, PromptBuilder, PERSONA_PREAMBLE};
pub use voice::{
    Accent, ElevenLabsSynthesizer, Gender, ProviderVoice, SpeechAudio, SpeechService,
    SpeechSynthesizer, Voice, VoiceCatalog,
};
