//! Chat endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::Result;
use crate::server::session::SessionId;
use crate::server::state::AppState;
use crate::types::{
    response::{ChatResponse, HistoryResponse, MessageResponse},
    ChatMode, ChatRequest, HistoryParams,
};

/// POST /chat - Plain tutor chat
pub async fn chat(
    State(state): State<AppState>,
    session: SessionId,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let reply = state
        .orchestrator()
        .answer(session.as_str(), &request.message, ChatMode::Standard)
        .await?;

    Ok(Json(ChatResponse::from_reply(reply)))
}

/// POST /chat/rag - Chat grounded in the knowledge base
pub async fn chat_rag(
    State(state): State<AppState>,
    session: SessionId,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let reply = state
        .orchestrator()
        .answer(session.as_str(), &request.message, ChatMode::Rag)
        .await?;

    Ok(Json(ChatResponse::from_reply(reply).with_legacy_aliases()))
}

/// GET /chat/history - Recent turns of the session
pub async fn history(
    State(state): State<AppState>,
    session: SessionId,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryResponse> {
    let limit = params
        .limit
        .unwrap_or(state.config().conversation.display_limit);
    let messages = state.conversations().history(session.as_str(), limit);

    Json(HistoryResponse {
        session_id: session.0,
        messages,
    })
}

/// DELETE /chat/clear - Forget the session's history
pub async fn clear(State(state): State<AppState>, session: SessionId) -> Json<MessageResponse> {
    state.conversations().clear(session.as_str());
    tracing::info!("Cleared chat history for session {}", session.as_str());

    Json(MessageResponse {
        message: "Chat history cleared".to_string(),
    })
}
