//! Core data models for the intake dialogue

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reply emitted once the user confirms the collected details
pub const TERMINAL_MARKER: &str = "END OF CONVERSATION";

/// Emitted exactly once, when every core slot has been collected
pub const SIGNATURE_REQUEST: &str = "Thanks! One last thing before we wrap up — could you give me your initials and your full name for the signature?";

/// Confidence assumed when the extractor omits one
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DialoguePhase {
    Collecting,
    AwaitingConfirmation,
    SummaryPresented,
    Ended,
}

//
// ================= Proposals =================
//

/// A candidate slot value emitted by extraction, not yet committed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Proposal {
    pub slot: String,
    pub value: String,
    pub confidence: f64,
}

impl Proposal {
    pub fn new(slot: impl Into<String>, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            slot: slot.into(),
            value: value.into(),
            confidence,
        }
    }
}

/// A proposal held back until the user says yes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub slot: String,
    pub value: String,
}

impl PendingConfirmation {
    /// Question asked while this confirmation is outstanding
    pub fn question(&self) -> String {
        format!("You said: {}. Did I get that right for {}?", self.value, self.slot)
    }

    /// Re-prompt after the user rejects the proposed value
    pub fn retry_prompt(&self) -> String {
        format!(
            "Got it — let's try again. What should I note down for {}?",
            self.slot
        )
    }
}

impl From<Proposal> for PendingConfirmation {
    fn from(proposal: Proposal) -> Self {
        Self {
            slot: proposal.slot,
            value: proposal.value,
        }
    }
}

impl fmt::Display for DialoguePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DialoguePhase::Collecting => "Collecting",
            DialoguePhase::AwaitingConfirmation => "Awaiting-Confirmation",
            DialoguePhase::SummaryPresented => "Summary-Presented",
            DialoguePhase::Ended => "Ended",
        };
        write!(f, "{}", s)
    }
}
