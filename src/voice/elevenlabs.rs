//! ElevenLabs text-to-speech client

use crate::error::IntakeError;
use crate::voice::SpeechSynthesizer;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";
pub const DEFAULT_MODEL_ID: &str = "eleven_monolingual_v1";

pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    base_url: String,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsClient {
    pub fn new(
        api_key: String,
        voice_id: impl Into<String>,
        model_id: impl Into<String>,
    ) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            voice_id: voice_id.into(),
            model_id: model_id.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.voice_id)
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> crate::Result<Vec<u8>> {
        info!(voice_id = %self.voice_id, chars = text.len(), "Calling ElevenLabs TTS");

        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| IntakeError::SynthesisError(format!("ElevenLabs request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "ElevenLabs error response: {}", error_text);
            return Err(IntakeError::SynthesisError(format!(
                "ElevenLabs error ({}): {}",
                status, error_text
            )));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_includes_voice() {
        let client = ElevenLabsClient::new("key".to_string(), DEFAULT_VOICE_ID, DEFAULT_MODEL_ID).unwrap();
        assert!(client.endpoint().ends_with("/text-to-speech/EXAVITQu4vr4xnSDxMaL"));
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(SpeechRequest {
            text: "Hello!",
            model_id: DEFAULT_MODEL_ID,
        })
        .unwrap();
        assert_eq!(body["text"], "Hello!");
        assert_eq!(body["model_id"], "eleven_monolingual_v1");
    }
}
