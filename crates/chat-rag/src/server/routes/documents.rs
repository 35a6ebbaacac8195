//! Knowledge-base endpoints: upload, listing, search and maintenance

use axum::{
    extract::{Multipart, Path, Query, State},
    Form, Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingestion::Upload;
use crate::server::state::AppState;
use crate::types::{
    response::{
        ClearKnowledgeBaseResponse, DeleteDocumentResponse, DocumentListResponse,
        DocumentSummary, SearchHit, SearchResponse, StatsResponse, SupportedFormat,
        SupportedFormatsResponse, TestQueryResponse, UploadResponse,
    },
    FileType, SearchParams, TestQueryForm,
};

/// A file field plus its optional metadata fields
#[derive(Default)]
struct UploadForm {
    filename: Option<String>,
    content_type: Option<String>,
    data: Option<Vec<u8>>,
    title: Option<String>,
    description: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.filename = field.file_name().map(str::to_string);
                form.content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| Error::validation(format!("Failed to read file: {}", e)))?;
                form.data = Some(data.to_vec());
            }
            "title" | "description" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| Error::validation(format!("Failed to read {}: {}", name, e)))?;
                if name == "title" {
                    form.title = Some(value);
                } else {
                    form.description = Some(value);
                }
            }
            _ => tracing::debug!("Ignoring multipart field '{}'", name),
        }
    }

    Ok(form)
}

/// POST /documents/upload - Ingest one file into the knowledge base
pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let form = read_upload_form(multipart).await?;
    let (Some(filename), Some(data)) = (form.filename.as_deref(), form.data.as_deref()) else {
        return Err(Error::validation("No file provided"));
    };

    let document = state
        .ingestor()
        .ingest(Upload {
            filename,
            content_type: form.content_type.as_deref(),
            data,
            title: form.title.as_deref(),
            description: form.description.as_deref(),
        })
        .await?;

    Ok(Json(UploadResponse::from_document(&document)))
}

/// GET /documents - List all documents
pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    let documents: Vec<DocumentSummary> = state
        .knowledge_base()
        .documents()
        .iter()
        .map(DocumentSummary::from)
        .collect();
    let total_count = documents.len();

    Json(DocumentListResponse {
        documents,
        total_count,
    })
}

/// GET /documents/:id - Get a specific document
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentSummary>> {
    let doc = state
        .knowledge_base()
        .document(&id)
        .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

    Ok(Json(DocumentSummary::from(&doc)))
}

/// DELETE /documents/:id - Delete a document and its chunks
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteDocumentResponse>> {
    let deleted_chunks = state.knowledge_base().delete_document(&id).await?;

    Ok(Json(DeleteDocumentResponse {
        success: true,
        document_id: id,
        deleted_chunks,
    }))
}

/// DELETE /documents/clear - Reset the knowledge base
pub async fn clear_knowledge_base(
    State(state): State<AppState>,
) -> Result<Json<ClearKnowledgeBaseResponse>> {
    let (deleted_documents, deleted_chunks) = state.knowledge_base().reset().await?;

    Ok(Json(ClearKnowledgeBaseResponse {
        success: true,
        deleted_documents,
        deleted_chunks,
    }))
}

/// GET /documents/search - Similarity search without generation
pub async fn search_documents(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(Error::validation("Query parameter 'query' is required"));
    }
    let limit = params
        .limit
        .unwrap_or(state.config().retrieval.search_limit);

    let results: Vec<SearchHit> = state
        .retriever()
        .retrieve(query, limit, 0.0)
        .await?
        .iter()
        .map(|r| SearchHit::from_chunk(&r.chunk, r.similarity))
        .collect();

    Ok(Json(SearchResponse {
        success: true,
        query: query.to_string(),
        total_results: results.len(),
        results,
    }))
}

/// GET /documents/stats - Knowledge-base counts
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        success: true,
        stats: state.knowledge_base().stats(),
    })
}

/// GET /documents/supported-formats - Accepted upload formats and size limit
pub async fn supported_formats(State(state): State<AppState>) -> Json<SupportedFormatsResponse> {
    let max = state.ingestor().max_upload_size();

    Json(SupportedFormatsResponse {
        supported_formats: FileType::ALL.iter().copied().map(SupportedFormat::from).collect(),
        max_file_size: format!("{}MB", max / (1024 * 1024)),
        max_file_size_bytes: max,
    })
}

/// POST /documents/test-query - Answer a question without touching any session
pub async fn test_query(
    State(state): State<AppState>,
    Form(form): Form<TestQueryForm>,
) -> Result<Json<TestQueryResponse>> {
    let has_context = !state.knowledge_base().is_empty();
    let reply = state
        .orchestrator()
        .preview(&form.query, form.use_context)
        .await?;

    Ok(Json(TestQueryResponse {
        success: reply.error.is_none(),
        query: form.query,
        answer: reply.text,
        context_used: reply.used_retrieval,
        has_context,
        source_documents: reply.source_chunks,
        error: reply.error,
    }))
}
