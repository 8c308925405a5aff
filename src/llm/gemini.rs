//! Gemini API client
//!
//! Serves both the chat-completion capability used by extraction and
//! fallback, and inline-audio transcription for the voice endpoint.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::IntakeError;
use crate::llm::{ChatRole, CompletionRequest, LanguageModel};
use crate::voice::Transcriber;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const TRANSCRIPTION_PROMPT: &str = "You are transcribing speech for a business form. \
The user may say business names, postal codes, emails, and names. \
Avoid guessing; transcribe phonetically when unclear. \
Return only the transcript text, in English, with no commentary.";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: impl Into<String>) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        })
    }

    /// Point the client at a different endpoint root (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }

    async fn generate(&self, request: &GeminiRequest) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(IntakeError::LlmError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        info!(model = %self.model, "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                IntakeError::LlmError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(IntakeError::LlmError(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            IntakeError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        first_candidate_text(&gemini_response)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, request: &CompletionRequest) -> crate::Result<String> {
        let contents = request
            .messages
            .iter()
            .map(|m| Content {
                role: Some(gemini_role(m.role).to_string()),
                parts: vec![Part::text(&m.content)],
            })
            .collect();

        let body = GeminiRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: Some(SystemInstruction {
                parts: vec![Part::text(&request.system)],
            }),
        };

        let answer = self.generate(&body).await?;
        Ok(answer.trim().to_string())
    }
}

#[async_trait]
impl Transcriber for GeminiClient {
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> crate::Result<String> {
        let body = GeminiRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part::text(TRANSCRIPTION_PROMPT),
                    Part::inline(mime_type, BASE64.encode(audio)),
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 512,
            },
            system_instruction: None,
        };

        self.generate(&body)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|e| IntakeError::TranscriptionError(e.to_string()))
    }
}

fn gemini_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

fn first_candidate_text(response: &GeminiResponse) -> crate::Result<String> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| IntakeError::LlmError("No response from Gemini API".to_string()))?;

    let text: String = candidate
        .content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.is_empty() {
        return Err(IntakeError::LlmError("Empty response from Gemini".to_string()));
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn inline(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text("What's your DBA name?")],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("What's your DBA name?"));
        assert!(!json.contains("system_instruction"));
        assert!(!json.contains("inline_data"));
    }

    #[test]
    fn test_inline_audio_part() {
        let part = Part::inline("audio/webm", BASE64.encode(b"abc"));
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["inline_data"]["mime_type"], "audio/webm");
        assert_eq!(json["inline_data"]["data"], "YWJj");
    }

    #[test]
    fn test_roles_map_to_gemini_names() {
        let message = ChatMessage::new(ChatRole::Assistant, "Hi there");
        assert_eq!(gemini_role(message.role), "model");
        assert_eq!(gemini_role(ChatRole::User), "user");
    }

    #[test]
    fn test_candidate_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"there"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_candidate_text(&response).unwrap(), "Hello there");

        let empty: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(first_candidate_text(&empty).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = GeminiClient::new(String::new(), DEFAULT_MODEL).unwrap();
        let request = CompletionRequest {
            system: "system".to_string(),
            messages: vec![ChatMessage::user("hello")],
            temperature: 0.3,
        };

        let err = client.complete(&request).await.unwrap_err();
        assert!(err.to_string().to_lowercase().contains("api_key"));
    }
}
