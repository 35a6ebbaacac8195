//! chat-rag: AI tutor chat with a retrieval-augmented document knowledge base
//!
//! Uploaded PDF, DOCX, text and Markdown files are parsed, chunked, embedded
//! and indexed. Chat messages are answered by a hosted or local LLM, grounded
//! in the most similar chunks when the knowledge base has documents.

pub mod config;
pub mod conversation;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use conversation::{ChatOrchestrator, ConversationStore};
pub use error::{Error, Result};
pub use ingestion::{DocumentIngestor, Upload};
pub use retrieval::{KnowledgeBase, Retriever};
pub use types::{
    conversation::{ConversationTurn, Role},
    document::{Chunk, ChunkSource, Document, FileType},
    query::ChatMode,
    response::{AssistantReply, KnowledgeBaseStats},
};
