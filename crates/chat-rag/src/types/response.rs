//! Response types for chat and knowledge-base endpoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conversation::ConversationTurn;
use super::document::{Chunk, Document, FileType};

/// Snippet length shown for a cited chunk
const SNIPPET_CHARS: usize = 200;

/// Reference to a chunk used as answer context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source attribution (filename)
    pub source: String,
    /// Document title
    pub title: String,
    /// Leading part of the chunk text
    pub snippet: String,
    /// Similarity score (0.0-1.0)
    pub similarity: f32,
}

impl SourceRef {
    /// Create a source reference from a chunk and similarity score
    pub fn from_chunk(chunk: &Chunk, similarity: f32) -> Self {
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            source: chunk.source.filename.clone(),
            title: chunk.source.title.clone(),
            snippet: snippet(&chunk.text),
            similarity,
        }
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > SNIPPET_CHARS {
        let head: String = trimmed.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

/// Distinguishable failure signal attached to a degraded reply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyError {
    /// Failure kind (`generation_error`)
    pub kind: String,
    /// Underlying error message
    pub message: String,
}

/// Answer produced by the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    /// Reply text (the fallback text when generation failed)
    pub text: String,
    /// Whether retrieved chunks were supplied as context
    pub used_retrieval: bool,
    /// Chunks used as context, best first
    pub source_chunks: Vec<SourceRef>,
    /// Set when generation failed
    pub error: Option<ReplyError>,
}

impl AssistantReply {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Derived knowledge-base counts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct KnowledgeBaseStats {
    pub document_count: usize,
    pub chunk_count: usize,
    pub embedding_dimension: usize,
}

/// Response for `POST /chat` and `POST /chat/rag`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Canonical reply field
    pub reply: String,
    /// Whether retrieved chunks were used
    pub used_retrieval: bool,
    /// Cited chunks
    pub sources: Vec<SourceRef>,
    /// Generation failure signal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
    /// Legacy alias of `reply`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Legacy alias of `reply`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl ChatResponse {
    /// Canonical response shape
    pub fn from_reply(reply: AssistantReply) -> Self {
        Self {
            reply: reply.text,
            used_retrieval: reply.used_retrieval,
            sources: reply.source_chunks,
            error: reply.error,
            response: None,
            answer: None,
        }
    }

    /// Add the `response` and `answer` aliases older clients read
    pub fn with_legacy_aliases(mut self) -> Self {
        self.response = Some(self.reply.clone());
        self.answer = Some(self.reply.clone());
        self
    }
}

/// Response for `GET /chat/history`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<ConversationTurn>,
}

/// Simple message body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response from document upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Whether ingestion was successful
    pub success: bool,
    /// Human-readable summary
    pub message: String,
    /// Uploaded filename
    pub filename: String,
    /// Registered document ID
    pub document_id: Uuid,
    /// Number of chunks created
    pub chunks_created: usize,
    /// IDs of the created chunks
    pub chunk_ids: Vec<Uuid>,
}

impl UploadResponse {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            success: true,
            message: format!(
                "Successfully processed and indexed {} document chunks",
                doc.chunk_ids.len()
            ),
            filename: doc.filename.clone(),
            document_id: doc.id,
            chunks_created: doc.chunk_ids.len(),
            chunk_ids: doc.chunk_ids.clone(),
        }
    }
}

/// Summary of an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document ID
    pub id: Uuid,
    /// Filename
    pub filename: String,
    /// Title
    pub title: String,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// File type
    pub file_type: FileType,
    /// Mime type
    pub mime_type: String,
    /// Number of pages (if applicable)
    pub total_pages: Option<u32>,
    /// Number of chunks created
    pub total_chunks: usize,
    /// File size in bytes
    pub file_size: u64,
    /// Upload timestamp
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            title: doc.title.clone(),
            description: doc.description.clone(),
            file_type: doc.file_type,
            mime_type: doc.mime_type.clone(),
            total_pages: doc.total_pages,
            total_chunks: doc.chunk_ids.len(),
            file_size: doc.file_size,
            uploaded_at: doc.uploaded_at,
        }
    }
}

/// Response for listing documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    /// List of documents
    pub documents: Vec<DocumentSummary>,
    /// Total count
    pub total_count: usize,
}

/// Response for deleting one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDocumentResponse {
    pub success: bool,
    pub document_id: Uuid,
    pub deleted_chunks: usize,
}

/// Response for resetting the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearKnowledgeBaseResponse {
    pub success: bool,
    pub deleted_documents: usize,
    pub deleted_chunks: usize,
}

/// One knowledge-base search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Chunk text
    pub content: String,
    /// Chunk metadata
    pub metadata: serde_json::Value,
    /// Source filename
    pub source: String,
    /// Similarity score (0.0-1.0)
    pub similarity: f32,
}

impl SearchHit {
    pub fn from_chunk(chunk: &Chunk, similarity: f32) -> Self {
        Self {
            content: chunk.text.clone(),
            metadata: chunk.metadata(),
            source: chunk.source.filename.clone(),
            similarity,
        }
    }
}

/// Response for `GET /documents/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total_results: usize,
}

/// Response for `GET /documents/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: KnowledgeBaseStats,
}

/// One accepted upload format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedFormat {
    pub extension: String,
    pub description: String,
    pub mime_types: Vec<String>,
}

impl From<FileType> for SupportedFormat {
    fn from(file_type: FileType) -> Self {
        Self {
            extension: file_type.extension().to_string(),
            description: file_type.description().to_string(),
            mime_types: vec![file_type.mime_type().to_string()],
        }
    }
}

/// Response for `GET /documents/supported-formats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedFormatsResponse {
    pub supported_formats: Vec<SupportedFormat>,
    /// Human-readable limit, e.g. "10MB"
    pub max_file_size: String,
    pub max_file_size_bytes: usize,
}

/// Response for `POST /documents/test-query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestQueryResponse {
    pub success: bool,
    pub query: String,
    pub answer: String,
    /// Whether any retrieved chunk was placed in the prompt
    pub context_used: bool,
    /// Whether the knowledge base had documents to draw from
    pub has_context: bool,
    pub source_documents: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}
