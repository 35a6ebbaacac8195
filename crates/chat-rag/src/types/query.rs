//! Request types for chat and knowledge-base endpoints

use serde::{Deserialize, Serialize};

/// How the orchestrator should answer a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Plain chat without retrieval
    Standard,
    /// Retrieval-augmented when the knowledge base has documents
    Rag,
}

/// Chat message request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message
    pub message: String,
}

/// Query parameters for `GET /chat/history`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryParams {
    /// Maximum number of turns to return (most recent last)
    pub limit: Option<usize>,
}

/// Query parameters for `GET /documents/search`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    /// Search text
    #[serde(default)]
    pub query: String,
    /// Maximum number of results (default from configuration)
    pub limit: Option<usize>,
}

/// Form body for `POST /documents/test-query`
#[derive(Debug, Clone, Deserialize)]
pub struct TestQueryForm {
    /// Question to answer
    pub query: String,
    /// Whether to ground the answer in the knowledge base (default: true)
    #[serde(default = "default_use_context")]
    pub use_context: bool,
}

fn default_use_context() -> bool {
    true
}
