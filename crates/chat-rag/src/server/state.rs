//! Application state for the chat server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::conversation::{ChatOrchestrator, ConversationStore};
use crate::error::Result;
use crate::ingestion::{DocumentIngestor, TextChunker};
use crate::providers::{
    embedder_from_config, llm_from_config, EmbeddingProvider, LlmProvider, LocalVectorStore,
    VectorStoreProvider,
};
use crate::retrieval::{KnowledgeBase, Retriever};
use crate::storage::{ConversationBackend, ConversationDb};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    knowledge_base: Arc<KnowledgeBase>,
    ingestor: DocumentIngestor,
    retriever: Retriever,
    orchestrator: ChatOrchestrator,
}

impl AppState {
    /// Build providers from configuration, open the conversation database
    /// and restore the knowledge-base snapshot
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing chat state (embeddings: {:?}/{}, generator: {:?}/{})",
            config.embeddings.provider,
            config.embeddings.model,
            config.llm.provider,
            config.llm.model
        );

        let embedder = embedder_from_config(&config)?;
        let llm = llm_from_config(&config)?;

        let backend: Option<Arc<dyn ConversationBackend>> = match ConversationDb::open(&config.storage.database) {
            Ok(db) => {
                tracing::info!("Conversation database: {}", config.storage.database);
                Some(Arc::new(db))
            }
            Err(e) => {
                tracing::warn!("Conversation history will not survive restarts: {}", e);
                None
            }
        };

        let state = Self::with_providers(config, embedder, llm, backend);

        match state.knowledge_base().restore().await {
            Ok(0) => tracing::info!("Starting with an empty knowledge base"),
            Ok(n) => tracing::info!("Knowledge base restored with {} documents", n),
            Err(e) => tracing::warn!("Could not restore knowledge base snapshot: {}", e),
        }

        Ok(state)
    }

    /// Assemble state around already-built providers
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        backend: Option<Arc<dyn ConversationBackend>>,
    ) -> Self {
        let dimension = config.embeddings.dimensions;
        let store: Arc<dyn VectorStoreProvider> = Arc::new(LocalVectorStore::new(dimension));
        let knowledge_base = Arc::new(KnowledgeBase::new(
            store.clone(),
            dimension,
            config.storage.snapshot_path.clone(),
        ));

        let ingestor = DocumentIngestor::new(
            TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap),
            embedder.clone(),
            knowledge_base.clone(),
            config.server.max_upload_size,
        );

        let conversations = Arc::new(match backend {
            Some(backend) => ConversationStore::with_backend(backend),
            None => ConversationStore::in_memory(),
        });

        let orchestrator = ChatOrchestrator::new(
            &config,
            Retriever::new(embedder.clone(), store.clone(), dimension),
            knowledge_base.clone(),
            llm.clone(),
            conversations,
        );

        Self {
            inner: Arc::new(AppStateInner {
                retriever: Retriever::new(embedder.clone(), store, dimension),
                config,
                embedder,
                llm,
                knowledge_base,
                ingestor,
                orchestrator,
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.inner.knowledge_base
    }

    pub fn ingestor(&self) -> &DocumentIngestor {
        &self.inner.ingestor
    }

    /// Retriever for knowledge-base search
    pub fn retriever(&self) -> &Retriever {
        &self.inner.retriever
    }

    pub fn orchestrator(&self) -> &ChatOrchestrator {
        &self.inner.orchestrator
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        self.inner.orchestrator.conversations()
    }
}
