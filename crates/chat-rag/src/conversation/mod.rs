//! Conversation history and the retrieval-augmented chat pipeline

mod orchestrator;
mod store;

pub use orchestrator::{ChatOrchestrator, FALLBACK_REPLY};
pub use store::ConversationStore;
