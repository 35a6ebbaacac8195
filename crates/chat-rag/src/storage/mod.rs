//! Storage module for durable conversation history

mod database;

use crate::error::Result;
use crate::types::ConversationTurn;

pub use database::ConversationDb;

/// Durable store behind the in-memory conversation log.
///
/// Calls are synchronous so a user/assistant pair is written without an await
/// point between them.
pub trait ConversationBackend: Send + Sync {
    /// Append turns in order, as one unit
    fn append(&self, turns: &[ConversationTurn]) -> Result<()>;

    /// All stored turns of a session in append order
    fn load(&self, session_id: &str) -> Result<Vec<ConversationTurn>>;

    /// Delete a session's turns, returning how many were removed
    fn clear(&self, session_id: &str) -> Result<usize>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
