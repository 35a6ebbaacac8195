//! Query-time retrieval: embed the question and rank stored chunks

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorSearchResult, VectorStoreProvider};

/// Embeds queries and searches the vector index
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    dimension: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        dimension: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            dimension,
        }
    }

    /// Return up to `top_k` chunks with similarity at least `threshold`,
    /// most similar first.
    ///
    /// An empty index or `top_k == 0` short-circuits without calling the embedder.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<VectorSearchResult>> {
        if top_k == 0 || self.store.is_empty().await? {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        if embedding.len() != self.dimension {
            return Err(Error::embedding(format!(
                "Query embedding has {} dimensions, expected {}",
                embedding.len(),
                self.dimension
            )));
        }

        let results = self.store.search(&embedding, top_k, threshold).await?;
        tracing::debug!(
            "Retrieved {} chunks (top_k={}, threshold={:.2})",
            results.len(),
            top_k,
            threshold
        );
        Ok(results)
    }
}
