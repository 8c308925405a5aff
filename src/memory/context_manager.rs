//! Context Window Management
//!
//! Selects the slice of the turn log that is handed to the language model.
//! The model only ever sees the most recent turns.

use crate::llm::{ChatMessage, ChatRole};
use crate::memory::store::{TurnLog, TurnRole};
use tracing::debug;

/// Configuration for context window management
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Number of recent turns forwarded to the model
    pub recent_turns: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { recent_turns: 12 }
    }
}

/// Builds bounded model context from the turn log
pub struct ContextManager {
    config: ContextConfig,
}

impl ContextManager {
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
        }
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Recent turns as chat messages, oldest first
    pub fn prepare_context_for_llm(&self, log: &TurnLog) -> Vec<ChatMessage> {
        let messages: Vec<ChatMessage> = log
            .recent(self.config.recent_turns)
            .map(|turn| {
                let role = match turn.role {
                    TurnRole::User => ChatRole::User,
                    TurnRole::Assistant => ChatRole::Assistant,
                };
                ChatMessage::new(role, turn.text.clone())
            })
            .collect();

        debug!(
            total_turns = log.len(),
            forwarded = messages.len(),
            "Prepared conversation context"
        );

        messages
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::Turn;

    #[test]
    fn test_context_manager_creation() {
        let manager = ContextManager::new();
        assert_eq!(manager.config().recent_turns, 12);
    }

    #[test]
    fn test_prepare_context_is_bounded() {
        let manager = ContextManager::new();
        let mut log = TurnLog::new();

        for i in 0..15 {
            log.push(Turn::user(format!("Answer {}", i)));
            log.push(Turn::assistant(format!("Question {}", i + 1)));
        }

        let context = manager.prepare_context_for_llm(&log);
        assert_eq!(context.len(), 12);
        assert_eq!(context.last().unwrap().content, "Question 15");
        assert_eq!(context.last().unwrap().role, ChatRole::Assistant);
    }

    #[test]
    fn test_custom_window() {
        let manager = ContextManager::with_config(ContextConfig { recent_turns: 2 });
        let mut log = TurnLog::new();
        log.push(Turn::assistant("Hi! What's your DBA name?"));
        log.push(Turn::user("Jane's Burgers"));
        log.push(Turn::assistant("Great, and the street address?"));

        let context = manager.prepare_context_for_llm(&log);
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].role, ChatRole::User);
    }
}
