//! Interactive chat session against a running server.

use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use mindset_chat::{Accent, Gender, Voice, VoiceCatalog};

use crate::client::ApiClient;

/// The voice the athlete has asked for so far.
///
/// Each message may name a gender, an accent, or both; the unnamed trait
/// keeps its previous value. A combination missing from the catalog leaves
/// the current voice in place.
#[derive(Debug, Clone, Copy)]
pub struct VoicePreference {
    gender: Gender,
    accent: Accent,
    current: &'static Voice,
}

impl VoicePreference {
    pub fn new(initial: &'static Voice) -> Self {
        Self {
            gender: initial.gender,
            accent: initial.accent,
            current: initial,
        }
    }

    pub fn current(&self) -> &'static Voice {
        self.current
    }

    /// Update traits from `message`; returns the new voice when it changed.
    pub fn observe(&mut self, message: &str) -> Option<&'static Voice> {
        let (gender, accent) = VoiceCatalog::detect_traits(message);
        if gender.is_none() && accent.is_none() {
            return None;
        }
        if let Some(g) = gender {
            self.gender = g;
        }
        if let Some(a) = accent {
            self.accent = a;
        }

        match VoiceCatalog.by_traits(self.gender, self.accent) {
            Some(voice) if voice.id != self.current.id => {
                self.current = voice;
                Some(voice)
            }
            Some(_) => None,
            None => {
                debug!(gender = ?self.gender, accent = ?self.accent, "No catalog voice for traits");
                None
            }
        }
    }
}

/// Read lines from stdin until `/exit` or EOF, sending each to `/chat`.
///
/// Each reply is synthesized to `tts_<user>.mp3` in the working directory
/// unless `speak` is false.
pub async fn run(
    client: &ApiClient,
    user_id: &str,
    initial: &'static Voice,
    speak: bool,
) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut voice = VoicePreference::new(initial);
    let audio_path = PathBuf::from(format!("tts_{}.mp3", user_id));

    println!("Chatting as '{}'. Type /exit to quit.", user_id);

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let Some(line) = stdin.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "/exit" {
            break;
        }

        if let Some(changed) = voice.observe(message) {
            println!("(voice switched to {})", changed.name);
        }

        let reply = match client.chat(user_id, message).await {
            Ok(reply) => reply,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                continue;
            }
        };
        println!("Coach: {}", reply.response);
        if !reply.history_recorded {
            warn!("Reply was not saved to history");
        }

        if speak {
            match client.tts(&reply.response, Some(voice.current().id)).await {
                Ok(audio) => {
                    tokio::fs::write(&audio_path, audio).await?;
                    println!("(audio saved to {})", audio_path.display());
                }
                Err(e) => eprintln!("Speech failed: {:#}", e),
            }
        }
    }

    Ok(())
}
