//! Core types for the chat service

pub mod conversation;
pub mod document;
pub mod query;
pub mod response;

pub use conversation::{ConversationTurn, Role};
pub use document::{Chunk, ChunkSource, Document, FileType};
pub use query::{ChatMode, ChatRequest, HistoryParams, SearchParams, TestQueryForm};
pub use response::{AssistantReply, KnowledgeBaseStats, ReplyError, SourceRef};
