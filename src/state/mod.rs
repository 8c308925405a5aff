//! Session state
//!
//! Everything one conversation remembers: slot values, the turn log, the
//! pending confirmation and the phase flags. Each hosted session owns its
//! own instance; the dialogue engine only borrows it per turn.

use crate::memory::{Turn, TurnLog};
use crate::models::{DialoguePhase, PendingConfirmation};
use crate::schema::{SlotSchema, SlotStore};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SessionState {
    session_id: Uuid,
    pub(crate) slots: SlotStore,
    pub(crate) log: TurnLog,
    pub(crate) pending: Option<PendingConfirmation>,
    pub(crate) summary_presented: bool,
    pub(crate) summary_confirmed: bool,
    pub(crate) ended: bool,
    pub(crate) last_assistant: String,
}

impl SessionState {
    pub fn new(schema: Arc<SlotSchema>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            slots: SlotStore::new(schema),
            log: TurnLog::new(),
            pending: None,
            summary_presented: false,
            summary_confirmed: false,
            ended: false,
            last_assistant: String::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub fn log(&self) -> &TurnLog {
        &self.log
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    pub fn summary_presented(&self) -> bool {
        self.summary_presented
    }

    pub fn summary_confirmed(&self) -> bool {
        self.summary_confirmed
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn last_assistant(&self) -> &str {
        &self.last_assistant
    }

    pub fn phase(&self) -> DialoguePhase {
        if self.ended {
            DialoguePhase::Ended
        } else if self.pending.is_some() {
            DialoguePhase::AwaitingConfirmation
        } else if self.summary_presented {
            DialoguePhase::SummaryPresented
        } else {
            DialoguePhase::Collecting
        }
    }

    /// Log an assistant utterance and remember it as the last prompt
    pub(crate) fn say(&mut self, text: impl Into<String>) -> String {
        let text = text.into();
        self.last_assistant = text.clone();
        self.log.push(Turn::assistant(text.clone()));
        text
    }

    pub(crate) fn hear(&mut self, text: &str) {
        self.log.push(Turn::user(text));
    }

    /// Back to a fresh session: slots, log, pending and flags all cleared.
    /// The session id is kept.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.log.clear();
        self.pending = None;
        self.summary_presented = false;
        self.summary_confirmed = false;
        self.ended = false;
        self.last_assistant.clear();
    }
}
