//! Provider abstractions for embeddings, LLM and vector storage
//!
//! Trait-based seams so the pipeline can run against Ollama, a hosted
//! chat-completions API, or fully local implementations.

pub mod embedding;
pub mod hashing;
pub mod hosted;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod vector_store;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, GeneratorBackend, RagConfig};
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use hashing::HashEmbedder;
pub use hosted::HostedLlm;
pub use llm::LlmProvider;
pub use local::LocalVectorStore;
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use vector_store::{VectorSearchResult, VectorStoreProvider};

/// Build the embedding provider selected by configuration
pub fn embedder_from_config(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match config.embeddings.provider {
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(&config.embeddings)?),
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(config.embeddings.dimensions)),
    })
}

/// Build the answer generator selected by configuration
pub fn llm_from_config(config: &RagConfig) -> Result<Arc<dyn LlmProvider>> {
    Ok(match config.llm.provider {
        GeneratorBackend::Hosted => Arc::new(HostedLlm::new(&config.llm)?),
        GeneratorBackend::Ollama => Arc::new(OllamaLlm::new(&config.llm)?),
    })
}
