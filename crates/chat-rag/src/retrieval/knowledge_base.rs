//! Knowledge base: document registry plus vector index, with a JSON snapshot on disk

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::VectorStoreProvider;
use crate::types::{Chunk, Document, KnowledgeBaseStats};

/// On-disk snapshot format
#[derive(Serialize, Deserialize)]
struct Snapshot {
    embedding_dimension: usize,
    documents: Vec<Document>,
    chunks: Vec<Chunk>,
}

/// Registry of ingested documents and the index holding their chunks
pub struct KnowledgeBase {
    store: Arc<dyn VectorStoreProvider>,
    documents: DashMap<Uuid, Document>,
    embedding_dimension: usize,
    snapshot_path: Option<PathBuf>,
    /// Held from reading state until the rename, so saves land in order
    snapshot_lock: Mutex<()>,
}

impl KnowledgeBase {
    pub fn new(
        store: Arc<dyn VectorStoreProvider>,
        embedding_dimension: usize,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            documents: DashMap::new(),
            embedding_dimension,
            snapshot_path,
            snapshot_lock: Mutex::new(()),
        }
    }

    /// The vector index
    pub fn store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.store
    }

    /// Configured embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embedding_dimension
    }

    /// Current counts, computed from the registry
    pub fn stats(&self) -> KnowledgeBaseStats {
        let chunk_count = self
            .documents
            .iter()
            .map(|entry| entry.value().chunk_ids.len())
            .sum();

        KnowledgeBaseStats {
            document_count: self.documents.len(),
            chunk_count,
            embedding_dimension: self.embedding_dimension,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Add a document whose chunks are already in the index
    pub fn register(&self, document: Document) {
        tracing::info!(
            "Registered document {} ({}, {} chunks)",
            document.id,
            document.filename,
            document.chunk_ids.len()
        );
        self.documents.insert(document.id, document);
    }

    pub fn document(&self, id: &Uuid) -> Option<Document> {
        self.documents.get(id).map(|entry| entry.value().clone())
    }

    /// All documents, oldest upload first
    pub fn documents(&self) -> Vec<Document> {
        let mut documents: Vec<Document> = self
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        documents.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        documents
    }

    /// Delete a document and its chunks, returning the number of chunks removed
    pub async fn delete_document(&self, id: &Uuid) -> Result<usize> {
        if !self.documents.contains_key(id) {
            return Err(Error::DocumentNotFound(id.to_string()));
        }

        let deleted_chunks = self.store.delete_by_document(id).await?;
        self.documents.remove(id);
        tracing::info!("Deleted document {} ({} chunks)", id, deleted_chunks);

        self.persist().await;
        Ok(deleted_chunks)
    }

    /// Remove every document and chunk, returning (documents, chunks) removed
    pub async fn reset(&self) -> Result<(usize, usize)> {
        let deleted_chunks = self.store.clear().await?;
        let deleted_documents = self.documents.len();
        self.documents.clear();
        tracing::warn!(
            "Knowledge base cleared ({} documents, {} chunks)",
            deleted_documents,
            deleted_chunks
        );

        self.persist().await;
        Ok((deleted_documents, deleted_chunks))
    }

    /// Save the snapshot, logging instead of failing
    pub async fn persist(&self) {
        if let Err(e) = self.save_snapshot().await {
            tracing::error!("Failed to save knowledge base snapshot: {}", e);
        }
    }

    /// Write the registry and index to the snapshot file, if one is configured
    pub async fn save_snapshot(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let _guard = self.snapshot_lock.lock().await;

        let snapshot = Snapshot {
            embedding_dimension: self.embedding_dimension,
            documents: self.documents(),
            chunks: self.store.export().await?,
        };
        let json = serde_json::to_vec(&snapshot)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so a crash never leaves a truncated snapshot
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!("Saved knowledge base snapshot to {}", path.display());
        Ok(())
    }

    /// Load the snapshot into an empty knowledge base, returning the number of documents restored
    pub async fn restore(&self) -> Result<usize> {
        let Some(path) = &self.snapshot_path else {
            return Ok(0);
        };
        if !path.exists() {
            return Ok(0);
        }

        let raw = tokio::fs::read(path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&raw)?;
        self.restore_from(snapshot, path).await
    }

    async fn restore_from(&self, snapshot: Snapshot, path: &Path) -> Result<usize> {
        if snapshot.embedding_dimension != self.embedding_dimension {
            tracing::warn!(
                "Ignoring snapshot {}: built with {} dimensions, configured for {}",
                path.display(),
                snapshot.embedding_dimension,
                self.embedding_dimension
            );
            return Ok(0);
        }

        // Chunks whose document is missing from the registry would be unreachable orphans
        let known: std::collections::HashSet<Uuid> =
            snapshot.documents.iter().map(|d| d.id).collect();
        let chunks: Vec<Chunk> = snapshot
            .chunks
            .into_iter()
            .filter(|c| known.contains(&c.document_id))
            .collect();

        self.store.insert_chunks(&chunks).await?;
        let restored = snapshot.documents.len();
        for document in snapshot.documents {
            self.documents.insert(document.id, document);
        }

        tracing::info!(
            "Restored {} documents and {} chunks from {}",
            restored,
            chunks.len(),
            path.display()
        );
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LocalVectorStore;
    use crate::types::{ChunkSource, FileType};

    fn document_with_chunks(dim: usize, texts: &[&str]) -> (Document, Vec<Chunk>) {
        let id = Uuid::new_v4();
        let source = ChunkSource {
            filename: "notes.txt".into(),
            title: "Notes".into(),
            file_type: FileType::Txt,
            page_count: None,
        };
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let mut chunk = Chunk::new(id, text.to_string(), source.clone(), i * 10, i as u32);
                chunk.embedding = vec![1.0; dim];
                chunk
            })
            .collect();

        let document = Document {
            id,
            filename: "notes.txt".into(),
            title: "Notes".into(),
            description: None,
            mime_type: "text/plain".into(),
            file_type: FileType::Txt,
            content_hash: "hash".into(),
            file_size: 42,
            total_pages: None,
            char_count: 42,
            uploaded_at: chrono::Utc::now(),
            chunk_ids: chunks.iter().map(|c| c.id).collect(),
        };
        (document, chunks)
    }

    fn knowledge_base(dim: usize, path: Option<PathBuf>) -> KnowledgeBase {
        KnowledgeBase::new(Arc::new(LocalVectorStore::new(dim)), dim, path)
    }

    #[tokio::test]
    async fn test_stats_and_delete() {
        let kb = knowledge_base(4, None);
        assert_eq!(kb.stats(), KnowledgeBaseStats { document_count: 0, chunk_count: 0, embedding_dimension: 4 });

        let (doc, chunks) = document_with_chunks(4, &["one", "two", "three"]);
        kb.store().insert_chunks(&chunks).await.unwrap();
        kb.register(doc.clone());

        let stats = kb.stats();
        assert_eq!(stats.document_count, 1);
        assert_eq!(stats.chunk_count, 3);

        assert_eq!(kb.delete_document(&doc.id).await.unwrap(), 3);
        assert!(kb.is_empty());
        assert_eq!(kb.store().len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_document() {
        let kb = knowledge_base(4, None);
        let err = kb.delete_document(&Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb").join("knowledge_base.json");

        let kb = knowledge_base(4, Some(path.clone()));
        let (doc, chunks) = document_with_chunks(4, &["alpha", "beta"]);
        kb.store().insert_chunks(&chunks).await.unwrap();
        kb.register(doc.clone());
        kb.save_snapshot().await.unwrap();

        let restored = knowledge_base(4, Some(path));
        assert_eq!(restored.restore().await.unwrap(), 1);
        assert_eq!(restored.stats(), kb.stats());
        assert_eq!(restored.document(&doc.id).unwrap().title, "Notes");

        let exported = restored.store().export().await.unwrap();
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].text, "alpha");
    }

    #[tokio::test]
    async fn test_snapshot_with_other_dimension_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge_base.json");

        let kb = knowledge_base(4, Some(path.clone()));
        let (doc, chunks) = document_with_chunks(4, &["alpha"]);
        kb.store().insert_chunks(&chunks).await.unwrap();
        kb.register(doc);
        kb.save_snapshot().await.unwrap();

        let other = knowledge_base(8, Some(path));
        assert_eq!(other.restore().await.unwrap(), 0);
        assert!(other.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge_base.json");
        let kb = Arc::new(knowledge_base(4, Some(path.clone())));

        for round in 0..20 {
            let (doc, chunks) = document_with_chunks(4, &["alpha", "beta"]);
            kb.store().insert_chunks(&chunks).await.unwrap();
            kb.register(doc);

            let saves: Vec<_> = (0..8)
                .map(|_| {
                    let kb = Arc::clone(&kb);
                    tokio::spawn(async move { kb.save_snapshot().await })
                })
                .collect();
            for save in saves {
                save.await.unwrap().unwrap();
            }

            let restored = knowledge_base(4, Some(path.clone()));
            assert_eq!(restored.restore().await.unwrap(), round + 1);
        }

        // Only the snapshot itself is left behind
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_reset() {
        let kb = knowledge_base(4, None);
        let (doc, chunks) = document_with_chunks(4, &["a", "b"]);
        kb.store().insert_chunks(&chunks).await.unwrap();
        kb.register(doc);

        assert_eq!(kb.reset().await.unwrap(), (1, 2));
        assert_eq!(kb.stats().chunk_count, 0);
    }
}
