//! In-memory vector store with exact cosine search

use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::Chunk;

use super::vector_store::{VectorSearchResult, VectorStoreProvider};

/// Cosine similarity, 0.0 when either vector has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Map cosine in [-1, 1] to a similarity in [0, 1]
pub fn cosine_to_similarity(cosine: f32) -> f32 {
    ((1.0 + cosine) / 2.0).clamp(0.0, 1.0)
}

/// Brute-force vector store holding chunks in insertion order
pub struct LocalVectorStore {
    dimensions: usize,
    chunks: RwLock<Vec<Chunk>>,
}

impl LocalVectorStore {
    /// Create an empty store for vectors of `dimensions` length
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            chunks: RwLock::new(Vec::new()),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn check_dimensions(&self, chunk: &Chunk) -> Result<()> {
        if chunk.embedding.len() != self.dimensions {
            return Err(Error::index(format!(
                "Chunk {} has {} dimensions, index expects {}",
                chunk.id,
                chunk.embedding.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            self.check_dimensions(chunk)?;
        }

        // One write lock for the whole batch keeps it atomic for readers
        let mut stored = self.chunks.write();
        stored.extend(chunks.iter().cloned());

        tracing::debug!("Inserted {} chunks ({} total)", chunks.len(), stored.len());
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Result<Vec<VectorSearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        if query_embedding.len() != self.dimensions {
            return Err(Error::index(format!(
                "Query has {} dimensions, index expects {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let stored = self.chunks.read();
        let mut scored: Vec<(usize, f32)> = stored
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let cosine = cosine_similarity(query_embedding, &chunk.embedding);
                (i, cosine_to_similarity(cosine))
            })
            .filter(|(_, similarity)| *similarity >= min_similarity)
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| VectorSearchResult {
                chunk: stored[i].clone(),
                similarity,
            })
            .collect())
    }

    async fn delete_by_document(&self, document_id: &Uuid) -> Result<usize> {
        let mut stored = self.chunks.write();
        let before = stored.len();
        stored.retain(|chunk| chunk.document_id != *document_id);
        Ok(before - stored.len())
    }

    async fn clear(&self) -> Result<usize> {
        let mut stored = self.chunks.write();
        let removed = stored.len();
        stored.clear();
        Ok(removed)
    }

    async fn export(&self) -> Result<Vec<Chunk>> {
        Ok(self.chunks.read().clone())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.chunks.read().len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkSource, FileType};

    fn chunk(document_id: Uuid, text: &str, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(
            document_id,
            text.to_string(),
            ChunkSource {
                filename: "doc.txt".into(),
                title: "doc.txt".into(),
                file_type: FileType::Txt,
                page_count: None,
            },
            0,
            0,
        );
        chunk.embedding = embedding;
        chunk
    }

    #[test]
    fn test_similarity_mapping() {
        assert!((cosine_to_similarity(1.0) - 1.0).abs() < 1e-6);
        assert!((cosine_to_similarity(0.0) - 0.5).abs() < 1e-6);
        assert!(cosine_to_similarity(-1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_and_limits() {
        let store = LocalVectorStore::new(2);
        let doc = Uuid::new_v4();
        store
            .insert_chunks(&[
                chunk(doc, "far", vec![-1.0, 0.0]),
                chunk(doc, "close", vec![0.9, 0.1]),
                chunk(doc, "exact", vec![1.0, 0.0]),
                chunk(doc, "side", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2, 0.0).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "exact");
        assert_eq!(results[1].chunk.text, "close");

        let thresholded = store.search(&[1.0, 0.0], 10, 0.7).await.unwrap();
        assert!(thresholded.iter().all(|r| r.similarity >= 0.7));
        assert_eq!(thresholded.len(), 2);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = LocalVectorStore::new(2);
        let doc = Uuid::new_v4();
        store
            .insert_chunks(&[
                chunk(doc, "first", vec![1.0, 0.0]),
                chunk(doc, "second", vec![2.0, 0.0]),
                chunk(doc, "third", vec![3.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 3, 0.0).await.unwrap();
        let texts: Vec<_> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_batch_with_bad_dimension_is_rejected_whole() {
        let store = LocalVectorStore::new(2);
        let doc = Uuid::new_v4();
        let result = store
            .insert_chunks(&[
                chunk(doc, "ok", vec![1.0, 0.0]),
                chunk(doc, "bad", vec![1.0, 0.0, 0.0]),
            ])
            .await;

        assert!(matches!(result, Err(Error::IndexUnavailable(_))));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_document() {
        let store = LocalVectorStore::new(2);
        let keep = Uuid::new_v4();
        let drop = Uuid::new_v4();
        store
            .insert_chunks(&[
                chunk(keep, "a", vec![1.0, 0.0]),
                chunk(drop, "b", vec![0.0, 1.0]),
                chunk(drop, "c", vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_by_document(&drop).await.unwrap(), 2);
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_store_and_zero_k() {
        let store = LocalVectorStore::new(2);
        assert!(store.search(&[1.0, 0.0], 5, 0.0).await.unwrap().is_empty());

        store
            .insert_chunks(&[chunk(Uuid::new_v4(), "a", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert!(store.search(&[1.0, 0.0], 0, 0.0).await.unwrap().is_empty());
    }
}
