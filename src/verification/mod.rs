//! Confirmation gate
//!
//! Decides, per extracted proposal, whether the value is committed
//! straight away or read back to the user first. Deterministic.

use crate::models::Proposal;
use crate::schema::SlotSchema;
use std::sync::Arc;
use tracing::debug;

/// Proposals for sensitive slots below this confidence are read back
pub const CONFIRMATION_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Commit,
    Confirm,
}

/// Gate over the schema's confirmation-sensitive subset
#[derive(Debug, Clone)]
pub struct ConfirmationGate {
    schema: Arc<SlotSchema>,
    threshold: f64,
}

impl ConfirmationGate {
    pub fn new(schema: Arc<SlotSchema>) -> Self {
        Self {
            schema,
            threshold: CONFIRMATION_THRESHOLD,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Confirm iff the slot is sensitive and the confidence is below threshold
    pub fn requires_confirmation(&self, slot: &str, confidence: f64) -> bool {
        self.schema.is_confirmation_sensitive(slot) && confidence < self.threshold
    }

    pub fn decide(&self, proposal: &Proposal) -> GateDecision {
        let decision = if self.requires_confirmation(&proposal.slot, proposal.confidence) {
            GateDecision::Confirm
        } else {
            GateDecision::Commit
        };

        debug!(
            slot = %proposal.slot,
            confidence = proposal.confidence,
            ?decision,
            "Confirmation gate"
        );

        decision
    }
}
