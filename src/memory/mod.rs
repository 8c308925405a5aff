//! Conversation Memory
//!
//! Turn log storage and the bounded context window handed to the
//! language model by extraction and fallback calls.

pub mod store;
pub mod context_manager;

pub use store::{Turn, TurnLog, TurnRole};
pub use context_manager::{ContextConfig, ContextManager};
