//! Merchant Intake Assistant
//!
//! A voice-driven assistant that collects Merchant Processing Application
//! fields through conversation:
//! - Extracts slot values from each utterance via a language model
//! - Reads back low-confidence identity/contact values before committing
//! - Requests initials and signature once the core fields are collected
//! - Hands the flattened values to the form overlay
//!
//! TURN LOOP:
//! UTTERANCE → RESOLVE PENDING → EXTRACT → GATE → COMPLETE? → CONFIRMED? → FALLBACK

pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod conversational;
pub mod document;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod memory;
pub mod models;
pub mod schema;
pub mod state;
pub mod summary;
pub mod verification;
pub mod voice;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use agent::DialogueEngine;
pub use classifier::{IntentClassifier, KeywordIntentClassifier};
pub use schema::{SlotSchema, SlotStore};
pub use state::SessionState;
