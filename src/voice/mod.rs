//! Speech collaborators
//!
//! Speech-to-text and text-to-speech are consumed as black boxes. A
//! transcription failure is a failed turn; a synthesis failure only
//! drops the audio from the reply.

use crate::error::IntakeError;
use crate::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::warn;

pub mod elevenlabs;
pub use elevenlabs::ElevenLabsClient;

/// Maximum audio upload accepted for transcription (10 MiB)
pub const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> Result<String>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Reject uploads that cannot be transcribed before calling out
pub fn validate_audio(audio: &[u8]) -> Result<()> {
    if audio.is_empty() {
        return Err(IntakeError::InvalidInput("audio upload is empty".to_string()));
    }
    if audio.len() > MAX_AUDIO_BYTES {
        return Err(IntakeError::InvalidInput(format!(
            "audio upload exceeds maximum size: {} bytes (limit: {} bytes)",
            audio.len(),
            MAX_AUDIO_BYTES
        )));
    }
    Ok(())
}

/// Transcribe after validating the upload; an empty transcript is a failure
pub async fn transcribe_upload(
    transcriber: &dyn Transcriber,
    audio: &[u8],
    mime_type: &str,
) -> Result<String> {
    validate_audio(audio)?;

    let transcript = transcriber.transcribe(audio, mime_type).await?;
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(IntakeError::TranscriptionError(
            "no speech recognised in upload".to_string(),
        ));
    }
    Ok(transcript.to_string())
}

/// Speak `text` and return base64 audio, or `None` when synthesis is
/// disabled, the text is empty, or the call fails.
pub async fn speak_base64(synthesizer: Option<&dyn SpeechSynthesizer>, text: &str) -> Option<String> {
    let synthesizer = synthesizer?;
    if text.trim().is_empty() {
        return None;
    }

    match synthesizer.synthesize(text).await {
        Ok(audio) => Some(BASE64.encode(audio)),
        Err(e) => {
            warn!("Speech synthesis failed, replying without audio: {}", e);
            None
        }
    }
}
