//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use uuid::Uuid;
use crate::error::Result;
use crate::types::Chunk;

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Similarity score (0.0 to 1.0, higher is more similar)
    pub similarity: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `LocalVectorStore`: In-memory brute-force cosine index
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert chunks with their embeddings.
    ///
    /// The batch becomes visible to searches all at once or not at all.
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` most similar chunks scoring at least `min_similarity`.
    ///
    /// Results are sorted by descending similarity; equal scores keep insertion order.
    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<VectorSearchResult>>;

    /// Delete all chunks for a document, returning how many were removed
    async fn delete_by_document(&self, document_id: &Uuid) -> Result<usize>;

    /// Remove every chunk, returning how many were removed
    async fn clear(&self) -> Result<usize>;

    /// All stored chunks in insertion order (for snapshots)
    async fn export(&self) -> Result<Vec<Chunk>>;

    /// Get total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
