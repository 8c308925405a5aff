//! Language model capability
//!
//! Extraction and fallback both talk to the model through the
//! `LanguageModel` trait so the dialogue core never depends on a
//! particular provider.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod gemini;
pub use gemini::GeminiClient;

#[cfg(test)]
pub(crate) use scripted::ScriptedModel;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }
}

/// One completion round-trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// Trait for completion providers
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[cfg(test)]
mod scripted {
    use super::{CompletionRequest, LanguageModel};
    use crate::error::IntakeError;
    use crate::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Replays canned completions in order, recording every request.
    /// Keeps the dialogue runnable without network access.
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedModel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_replies<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub async fn push_reply(&self, reply: impl Into<String>) {
            self.replies.lock().await.push_back(Ok(reply.into()));
        }

        pub async fn push_failure(&self, message: impl Into<String>) {
            self.replies
                .lock()
                .await
                .push_back(Err(IntakeError::LlmError(message.into())));
        }

        pub async fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().await.clone()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            self.requests.lock().await.push(request.clone());

            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(IntakeError::LlmError("no scripted reply left".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest {
            system: "system".to_string(),
            messages: vec![ChatMessage::user(text)],
            temperature: 0.3,
        }
    }

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::with_replies(["first", "second"]);

        assert_eq!(model.complete(&request("a")).await.unwrap(), "first");
        assert_eq!(model.complete(&request("b")).await.unwrap(), "second");
        assert!(model.complete(&request("c")).await.is_err());

        let seen = model.requests().await;
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].messages[0].content, "b");
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let model = ScriptedModel::new();
        model.push_failure("quota exceeded").await;

        let err = model.complete(&request("a")).await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }
}
