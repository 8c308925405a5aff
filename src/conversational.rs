//! Fallback responder
//!
//! When no slot rule produces a reply, the next question comes from an
//! open-ended conversational call over the recent turn log. This is the
//! last line of the turn: it never fails.

use crate::llm::{CompletionRequest, LanguageModel};
use crate::memory::{ContextManager, TurnLog};
use crate::models::TERMINAL_MARKER;
use std::sync::Arc;
use tracing::{info, warn};

/// Reply used when the conversational call fails
pub const APOLOGY_REPROMPT: &str = "Sorry, could you please repeat that?";

const FALLBACK_TEMPERATURE: f32 = 0.4;

const INSTRUCTION_PROMPT: &str = r#"You are a conversational AI assistant helping users fill out a Merchant Processing Application.

Be intelligent, friendly, and natural. Guide the user through collecting the following fields only:

- DBAName
- LegalCorporateName
- BusinessAddress
- BillingAddress
- City
- State
- Zip
- Phone
- Fax
- ContactName
- BusinessEmail
- ContactPhone
- ContactFax
- ContactEmail
- Website
- CustomerServiceEmail
- RetrievalRequestDestination
- MCCSICDescription

Ask one or two natural, context-aware questions at a time. Provide gentle examples if needed. Avoid robotic phrasing.
Always prioritize privacy and remind the user not to share sensitive information unless necessary for the form. For sections requiring specific types of data like percentages, business types, or legal requirements, offer examples to aid in understanding.
ONLY if the transcription is unclear or seems misspelled, spell it back to the user and ask for confirmation before moving on.
NEVER include external links, promotional messages, or teaching tips.
Once all these fields are collected, read back the entire collected information to the user and ask them to confirm it and mention that it may take a few seconds to process all the information.
After they confirm, ask for initials and/or draw signature after conversation if missing. Then respond with 'END OF CONVERSATION' and nothing else.

DO NOT REPEAT THE SUMMARY. DO NOT REPEAT END OF CONVERSATION."#;

/// Outcome of a fallback call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReply {
    /// A fresh assistant utterance, to be logged
    Spoken(String),
    /// Echo of the summary or terminal phrase after the summary was presented
    Suppressed,
    /// The call failed; the apology is not logged
    Apology,
}

impl FallbackReply {
    pub fn text(&self) -> &str {
        match self {
            FallbackReply::Spoken(text) => text,
            FallbackReply::Suppressed => "",
            FallbackReply::Apology => APOLOGY_REPROMPT,
        }
    }
}

pub struct FallbackResponder {
    model: Arc<dyn LanguageModel>,
    context_manager: ContextManager,
}

impl FallbackResponder {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            context_manager: ContextManager::new(),
        }
    }

    pub fn with_context_manager(mut self, context_manager: ContextManager) -> Self {
        self.context_manager = context_manager;
        self
    }

    /// Ask the model for the next utterance given the recent turns
    pub async fn respond(&self, log: &TurnLog, summary_presented: bool) -> FallbackReply {
        let request = CompletionRequest {
            system: INSTRUCTION_PROMPT.to_string(),
            messages: self.context_manager.prepare_context_for_llm(log),
            temperature: FALLBACK_TEMPERATURE,
        };

        match self.model.complete(&request).await {
            Ok(reply) => {
                let reply = reply.trim().to_string();
                if summary_presented && is_closing_echo(&reply) {
                    info!("Suppressing repeated summary/termination from fallback");
                    return FallbackReply::Suppressed;
                }
                FallbackReply::Spoken(reply)
            }
            Err(e) => {
                warn!("Assistant generation failed: {}", e);
                FallbackReply::Apology
            }
        }
    }
}

fn is_closing_echo(reply: &str) -> bool {
    let lowered = reply.to_lowercase();
    lowered.contains("summary") || lowered.contains(&TERMINAL_MARKER.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRole, ScriptedModel};
    use crate::memory::Turn;

    fn log_with(turns: &[(&str, bool)]) -> TurnLog {
        let mut log = TurnLog::new();
        for (text, from_user) in turns {
            if *from_user {
                log.push(Turn::user(*text));
            } else {
                log.push(Turn::assistant(*text));
            }
        }
        log
    }

    #[tokio::test]
    async fn test_spoken_reply_with_recent_context() {
        let model = Arc::new(ScriptedModel::with_replies(["  Great! What's the street address?  "]));
        let responder = FallbackResponder::new(model.clone());
        let log = log_with(&[("Hi! What's your DBA name?", false), ("Jane's Burgers", true)]);

        let reply = responder.respond(&log, false).await;
        assert_eq!(reply, FallbackReply::Spoken("Great! What's the street address?".to_string()));

        let requests = model.requests().await;
        assert!(requests[0].system.contains("Merchant Processing Application"));
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[1].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_context_bounded_to_twelve_turns() {
        let model = Arc::new(ScriptedModel::with_replies(["Next question?"]));
        let responder = FallbackResponder::new(model.clone());

        let mut log = TurnLog::new();
        for i in 0..30 {
            log.push(Turn::user(format!("turn {}", i)));
        }
        responder.respond(&log, false).await;

        let requests = model.requests().await;
        assert_eq!(requests[0].messages.len(), 12);
        assert_eq!(requests[0].messages[0].content, "turn 18");
    }

    #[tokio::test]
    async fn test_suppresses_echo_after_summary() {
        let model = Arc::new(ScriptedModel::with_replies([
            "Here is a Summary of your details...",
            "END OF CONVERSATION",
            "Here is a summary of your details...",
        ]));
        let responder = FallbackResponder::new(model);
        let log = log_with(&[("J.D., Jane Doe", true)]);

        assert_eq!(responder.respond(&log, true).await, FallbackReply::Suppressed);
        assert_eq!(responder.respond(&log, true).await.text(), "");
        // Before the summary is presented the same text passes through
        assert!(matches!(
            responder.respond(&log, false).await,
            FallbackReply::Spoken(_)
        ));
    }

    #[tokio::test]
    async fn test_failure_apologises() {
        let model = Arc::new(ScriptedModel::new());
        model.push_failure("503").await;
        let responder = FallbackResponder::new(model);

        let reply = responder.respond(&TurnLog::new(), false).await;
        assert_eq!(reply, FallbackReply::Apology);
        assert_eq!(reply.text(), APOLOGY_REPROMPT);
    }
}
