//! HTTP routes for the chat server

pub mod chat;
pub mod documents;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{delete, get, post},
    Json, Router,
};

use crate::server::state::AppState;
use crate::types::response::HealthResponse;

/// Multipart framing allowance on top of the file size limit
const MULTIPART_SLACK: usize = 1024 * 1024;

/// Build all routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(info))
        .route("/health", get(health))
        // Chat
        .route("/chat", post(chat::chat))
        .route("/chat/rag", post(chat::chat_rag))
        .route("/chat/history", get(chat::history))
        .route("/chat/clear", delete(chat::clear))
        // Knowledge base; oversized files must reach the handler to get a precise error
        .route(
            "/documents/upload",
            post(documents::upload_document)
                .layer(DefaultBodyLimit::max(max_upload_size + MULTIPART_SLACK)),
        )
        .route("/documents", get(documents::list_documents))
        .route("/documents/clear", delete(documents::clear_knowledge_base))
        .route("/documents/search", get(documents::search_documents))
        .route("/documents/stats", get(documents::stats))
        .route("/documents/supported-formats", get(documents::supported_formats))
        .route("/documents/test-query", post(documents::test_query))
        .route(
            "/documents/:id",
            get(documents::get_document).delete(documents::delete_document),
        )
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    tracing::debug!(
        "Health check (documents: {})",
        state.knowledge_base().stats().document_count
    );

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "chat-rag".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET / - API info
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "chat-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "AI tutor chat with a document knowledge base",
        "generator": {
            "provider": state.llm().name(),
            "model": state.llm().model(),
        },
        "embeddings": state.embedder().name(),
        "endpoints": {
            "POST /chat": "Chat with the tutor",
            "POST /chat/rag": "Chat grounded in uploaded documents",
            "GET /chat/history": "Session history (X-Session-Id header)",
            "DELETE /chat/clear": "Clear session history",
            "POST /documents/upload": "Upload a PDF, DOCX, TXT or Markdown file",
            "GET /documents": "List documents",
            "GET /documents/:id": "Get document details",
            "DELETE /documents/:id": "Delete a document and its chunks",
            "DELETE /documents/clear": "Clear the knowledge base",
            "GET /documents/search": "Similarity search over chunks",
            "GET /documents/stats": "Knowledge-base statistics",
            "GET /documents/supported-formats": "Accepted formats and size limit",
            "POST /documents/test-query": "Answer a question without recording it"
        }
    }))
}
