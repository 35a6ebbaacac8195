//! Ingestion pipeline orchestration

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::retrieval::KnowledgeBase;
use crate::types::{Chunk, Document, FileType};

use super::chunker::TextChunker;
use super::parser::FileParser;

/// Chunks sent to the embedder per request
const EMBED_BATCH_SIZE: usize = 16;

/// A file received for ingestion
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    pub filename: &'a str,
    /// Declared content type, consulted only when the filename has no extension
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
}

impl<'a> Upload<'a> {
    pub fn new(filename: &'a str, data: &'a [u8]) -> Self {
        Self {
            filename,
            content_type: None,
            data,
            title: None,
            description: None,
        }
    }
}

/// Turns uploaded files into indexed, embedded chunks
pub struct DocumentIngestor {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    knowledge_base: Arc<KnowledgeBase>,
    max_upload_size: usize,
}

impl DocumentIngestor {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        knowledge_base: Arc<KnowledgeBase>,
        max_upload_size: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            knowledge_base,
            max_upload_size,
        }
    }

    pub fn max_upload_size(&self) -> usize {
        self.max_upload_size
    }

    /// Format and size checks, run before any parsing
    pub fn check(&self, upload: &Upload<'_>) -> Result<FileType> {
        let filename = upload.filename.trim();
        if filename.is_empty() {
            return Err(Error::validation("No file selected"));
        }

        let file_type = FileType::detect(filename, upload.content_type).ok_or_else(|| {
            let allowed: Vec<&str> = FileType::ALL.iter().map(|t| t.extension()).collect();
            Error::UnsupportedFormat(format!(
                "'{}' is not supported. Allowed: {}",
                filename,
                allowed.join(", ")
            ))
        })?;

        if upload.data.len() > self.max_upload_size {
            return Err(Error::FileTooLarge {
                size: upload.data.len(),
                max: self.max_upload_size,
            });
        }

        Ok(file_type)
    }

    /// Parse, chunk, embed and index one upload.
    ///
    /// Either every chunk of the document becomes searchable or none does.
    /// The index is untouched until every chunk is embedded, and the document
    /// is registered right after the single insert with no await in between,
    /// so dropping this future part way never leaves orphan chunks.
    pub async fn ingest(&self, upload: Upload<'_>) -> Result<Document> {
        let file_type = self.check(&upload)?;
        let filename = upload.filename.trim().to_string();

        tracing::info!(
            "Ingesting {} ({} bytes, {})",
            filename,
            upload.data.len(),
            file_type
        );

        // PDF extraction is CPU bound
        let parse_name = filename.clone();
        let data = upload.data.to_vec();
        let parsed = tokio::task::spawn_blocking(move || {
            FileParser::parse(&parse_name, file_type, &data)
        })
        .await
        .map_err(|e| Error::internal(format!("Parser task failed: {}", e)))??;

        let title = upload
            .title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&filename)
            .to_string();

        let mut document = Document {
            id: Uuid::new_v4(),
            filename: filename.clone(),
            title,
            description: upload
                .description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            mime_type: file_type.mime_type().to_string(),
            file_type,
            content_hash: parsed.content_hash,
            file_size: upload.data.len() as u64,
            total_pages: parsed.total_pages,
            char_count: parsed.content.chars().count(),
            uploaded_at: chrono::Utc::now(),
            chunk_ids: Vec::new(),
        };

        let chunks = self.chunker.chunk_document(&document, &parsed.content);
        if chunks.is_empty() {
            return Err(Error::file_parse(&filename, "No text content could be extracted"));
        }
        tracing::debug!("Created {} chunks for {}", chunks.len(), filename);

        let embedded = self.embed_chunks(chunks).await?;

        if let Err(e) = self.knowledge_base.store().insert_chunks(&embedded).await {
            tracing::error!("Indexing {} failed, rolling back: {}", filename, e);
            if let Err(rollback) = self
                .knowledge_base
                .store()
                .delete_by_document(&document.id)
                .await
            {
                tracing::error!("Rollback for document {} failed: {}", document.id, rollback);
            }
            return Err(e);
        }

        document.chunk_ids = embedded.iter().map(|c| c.id).collect();
        self.knowledge_base.register(document.clone());
        self.knowledge_base.persist().await;

        tracing::info!(
            "Ingested {} as document {} ({} chunks)",
            filename,
            document.id,
            document.chunk_ids.len()
        );
        Ok(document)
    }

    /// Attach embeddings to every chunk, checking count and dimension per batch
    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let dimension = self.knowledge_base.embedding_dimension();
        let mut embedded = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                if embedding.len() != dimension {
                    return Err(Error::embedding(format!(
                        "Embedding has {} dimensions, expected {}",
                        embedding.len(),
                        dimension
                    )));
                }
                let mut chunk = chunk.clone();
                chunk.embedding = embedding;
                embedded.push(chunk);
            }
        }

        Ok(embedded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{HashEmbedder, LocalVectorStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;

    /// Fails every call after the first `ok_calls`
    struct FlakyEmbedder {
        inner: HashEmbedder,
        ok_calls: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_calls {
                return Err(Error::embedding("connection refused"));
            }
            self.inner.embed(text).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    /// Hangs forever once `ok_calls` texts have been embedded
    struct StallingEmbedder {
        inner: HashEmbedder,
        ok_calls: u32,
        calls: AtomicU32,
        stalled: Arc<Notify>,
    }

    #[async_trait]
    impl EmbeddingProvider for StallingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_calls {
                self.stalled.notify_one();
                std::future::pending::<()>().await;
            }
            self.inner.embed(text).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "stalling"
        }
    }

    /// `len` characters of prose ending in a full stop
    fn paragraph(seed: &str, len: usize) -> String {
        let mut text: String = seed.chars().cycle().take(len - 1).collect();
        text.push('.');
        text
    }

    fn ingestor(embedder: Arc<dyn EmbeddingProvider>, dim: usize) -> (DocumentIngestor, Arc<KnowledgeBase>) {
        let kb = Arc::new(KnowledgeBase::new(Arc::new(LocalVectorStore::new(dim)), dim, None));
        let ingestor = DocumentIngestor::new(TextChunker::new(1000, 200), embedder, kb.clone(), 1024 * 1024);
        (ingestor, kb)
    }

    #[tokio::test]
    async fn test_ingest_text_file() {
        let (ingestor, kb) = ingestor(Arc::new(HashEmbedder::new(64)), 64);
        let first = paragraph("Cells divide by mitosis into two identical daughter cells. ", 799);
        let second = paragraph("Meiosis halves the chromosome count to make gametes. ", 799);
        let third = paragraph("Crossing over shuffles alleles between paired chromosomes. ", 798);
        // Trailing spaces and a whitespace-only line collapse to single blank lines
        let text = format!("{}  \n\n{}\n \n{}\n", first, second, third);
        let extracted = format!("{}\n\n{}\n\n{}", first, second, third);
        assert_eq!(extracted.len(), 2400);

        let mut upload = Upload::new("notes.txt", text.as_bytes());
        upload.title = Some("  Study Notes ");
        let doc = ingestor.ingest(upload).await.unwrap();

        assert_eq!(doc.title, "Study Notes");
        assert_eq!(doc.file_type, FileType::Txt);
        assert_eq!(doc.char_count, 2400);
        assert_eq!(doc.chunk_ids.len(), 3);
        assert_eq!(kb.stats().chunk_count, 3);

        let stored = kb.store().export().await.unwrap();
        assert_eq!(
            stored.iter().map(|c| c.source_offset).collect::<Vec<_>>(),
            vec![0, 800, 1600]
        );
        assert_eq!(stored[0].text, extracted[..1000]);
        assert_eq!(stored[1].text, extracted[800..1800]);
        assert_eq!(stored[2].text, extracted[1600..]);
    }

    #[tokio::test]
    async fn test_title_defaults_to_filename() {
        let (ingestor, _) = ingestor(Arc::new(HashEmbedder::new(32)), 32);
        let doc = ingestor
            .ingest(Upload::new("readme.md", b"# Hello\n\nWorld"))
            .await
            .unwrap();
        assert_eq!(doc.title, "readme.md");
        assert_eq!(doc.chunk_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_unsupported_and_oversized() {
        let (ingestor, kb) = ingestor(Arc::new(HashEmbedder::new(32)), 32);

        let err = ingestor.ingest(Upload::new("tool.exe", b"MZ")).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));

        let big = vec![b'a'; 1024 * 1024 + 1];
        let err = ingestor.ingest(Upload::new("big.txt", &big)).await.unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { .. }));

        assert!(kb.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_rolls_back() {
        // 40 chunks: the first batch of 16 is indexed before the embedder fails
        let embedder = Arc::new(FlakyEmbedder {
            inner: HashEmbedder::new(32),
            ok_calls: 20,
            calls: AtomicU32::new(0),
        });
        let (ingestor, kb) = ingestor(embedder, 32);
        let text = "z".repeat(800 * 40 + 200);

        let err = ingestor.ingest(Upload::new("long.txt", text.as_bytes())).await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingService(_)));
        assert!(kb.is_empty());
        assert_eq!(kb.store().len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_ingest_leaves_no_chunks() {
        // 44 chunks: the embedder hangs on the first text of the second batch
        let stalled = Arc::new(Notify::new());
        let embedder = Arc::new(StallingEmbedder {
            inner: HashEmbedder::new(32),
            ok_calls: 16,
            calls: AtomicU32::new(0),
            stalled: Arc::clone(&stalled),
        });
        let (ingestor, kb) = ingestor(embedder, 32);
        let ingestor = Arc::new(ingestor);

        let task = {
            let ingestor = Arc::clone(&ingestor);
            let text = "w".repeat(800 * 43 + 1000);
            tokio::spawn(async move { ingestor.ingest(Upload::new("long.txt", text.as_bytes())).await })
        };

        stalled.notified().await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(kb.is_empty());
        assert_eq!(kb.store().len().await.unwrap(), 0);
        let hits = kb.store().search(&vec![1.0; 32], 10, 0.0).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let (ingestor, kb) = ingestor(Arc::new(HashEmbedder::new(16)), 32);
        let err = ingestor.ingest(Upload::new("a.txt", b"some words")).await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingService(_)));
        assert_eq!(kb.store().len().await.unwrap(), 0);
    }
}
