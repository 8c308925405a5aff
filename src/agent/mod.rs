//! Dialogue engine - drives one turn of the intake conversation
//!
//! RESOLVE PENDING → EXTRACT → GATE → COMMIT → COMPLETE? → CONFIRMED? → FALLBACK

use crate::classifier::{IntentClassifier, KeywordIntentClassifier};
use crate::conversational::{FallbackReply, FallbackResponder};
use crate::extraction::ExtractionAdapter;
use crate::llm::LanguageModel;
use crate::models::{PendingConfirmation, SIGNATURE_REQUEST, TERMINAL_MARKER};
use crate::schema::{SlotSchema, SlotStore};
use crate::state::SessionState;
use crate::summary::build_summary;
use crate::verification::{ConfirmationGate, GateDecision};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

const GREETINGS: &[&str] = &[
    "Hi there! Ready to fill out your Merchant Application? Let's get started — what's your DBA or business name?",
    "Hello! I'll be helping you fill out your merchant form. Let's begin with your business's DBA name.",
    "Welcome! Let's kick things off. What's the name your business operates under (DBA)?",
    "Hey! I'll guide you through your Merchant form. First, can you tell me your DBA or business name?",
    "Great to have you! To start, what's the doing-business-as (DBA) name for your company?",
];

/// Stateless turn processor; all conversation state lives in `SessionState`
pub struct DialogueEngine {
    schema: Arc<SlotSchema>,
    extractor: ExtractionAdapter,
    gate: ConfirmationGate,
    classifier: Box<dyn IntentClassifier>,
    fallback: FallbackResponder,
    fixed_greeting: Option<usize>,
}

impl DialogueEngine {
    pub fn new(model: Arc<dyn LanguageModel>, schema: Arc<SlotSchema>) -> Self {
        Self {
            extractor: ExtractionAdapter::new(Arc::clone(&model)),
            gate: ConfirmationGate::new(Arc::clone(&schema)),
            classifier: Box::new(KeywordIntentClassifier::new()),
            fallback: FallbackResponder::new(model),
            schema,
            fixed_greeting: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Always greet with the same opener (index wraps)
    pub fn with_fixed_greeting(mut self, index: usize) -> Self {
        self.fixed_greeting = Some(index);
        self
    }

    pub fn schema(&self) -> &Arc<SlotSchema> {
        &self.schema
    }

    /// A fresh, independently owned session for this engine's schema
    pub fn new_session(&self) -> SessionState {
        SessionState::new(Arc::clone(&self.schema))
    }

    /// Open the conversation with a greeting asking for the DBA name
    pub fn start_session(&self, state: &mut SessionState) -> String {
        let index = self
            .fixed_greeting
            .unwrap_or_else(|| Utc::now().timestamp_subsec_nanos() as usize);
        let greeting = GREETINGS[index % GREETINGS.len()];

        info!(session_id = %state.session_id(), "Starting intake session");
        state.say(greeting)
    }

    /// Process one user utterance and return the assistant's reply.
    ///
    /// The reply may be empty when the fallback echo is suppressed.
    pub async fn process_utterance(&self, state: &mut SessionState, text: &str) -> String {
        if state.ended {
            debug!("Utterance received after the conversation ended");
            return TERMINAL_MARKER.to_string();
        }

        state.hear(text);

        // === RESOLVE PENDING ===
        if let Some(pending) = state.pending.take() {
            if !self.schema.contains(&pending.slot) || state.slots.is_set(&pending.slot) {
                warn!(
                    slot = %pending.slot,
                    "Pending confirmation references an unknown or filled slot - discarding"
                );
            } else if self.classifier.affirms_field(text) {
                state.slots.set_if_unset(&pending.slot, pending.value.clone());
                info!(slot = %pending.slot, "Confirmed slot value committed");
            } else {
                info!(slot = %pending.slot, "Proposed value rejected - asking again");
                return state.say(pending.retry_prompt());
            }
        }

        // === EXTRACT + GATE ===
        let proposals = self
            .extractor
            .extract(&state.last_assistant, text, &state.slots)
            .await;

        for proposal in proposals {
            match self.gate.decide(&proposal) {
                GateDecision::Confirm => {
                    info!(
                        slot = %proposal.slot,
                        confidence = proposal.confidence,
                        "Low-confidence value needs confirmation"
                    );
                    let pending = PendingConfirmation::from(proposal);
                    let question = pending.question();
                    state.pending = Some(pending);
                    return state.say(question);
                }
                GateDecision::Commit => {
                    if state.slots.set_if_unset(&proposal.slot, proposal.value) {
                        info!(
                            slot = %proposal.slot,
                            confidence = proposal.confidence,
                            "Slot committed"
                        );
                    }
                }
            }
        }

        // === COMPLETE? ===
        if state.slots.core_complete() && !state.summary_presented {
            state.summary_presented = true;
            info!("All core slots collected - requesting initials and signature");
            return state.say(SIGNATURE_REQUEST);
        }

        // === CONFIRMED? ===
        if state.summary_presented && !state.summary_confirmed && self.classifier.affirms_summary(text) {
            state.summary_confirmed = true;
            state.ended = true;
            info!(session_id = %state.session_id(), "Details confirmed - conversation ended");
            return state.say(TERMINAL_MARKER);
        }

        // === FALLBACK ===
        match self.fallback.respond(&state.log, state.summary_presented).await {
            FallbackReply::Spoken(reply) => state.say(reply),
            other => other.text().to_string(),
        }
    }

    /// Current slot values
    pub fn slot_store<'a>(&self, state: &'a SessionState) -> &'a SlotStore {
        state.slots()
    }

    /// Read-back of everything collected so far
    pub fn summary(&self, state: &SessionState) -> String {
        build_summary(state.slots())
    }

    pub fn reset_session(&self, state: &mut SessionState) {
        info!(session_id = %state.session_id(), "Resetting intake session");
        state.reset();
    }
}
