//! Configuration for the chat service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Maximum number of generation retries accepted by validation
pub const MAX_GENERATION_RETRIES: u32 = 3;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Answer generator configuration
    pub llm: LlmConfig,
    /// Persistence configuration
    pub storage: StorageConfig,
    /// Conversation configuration
    pub conversation: ConversationConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Apply overrides from process environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides using the given variable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("AI_CHATBOT_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("AI_CHATBOT_MODEL_NAME").filter(|m| !m.is_empty()) {
            self.llm.model = model;
        }
        if let Some(url) = lookup("AI_CHATBOT_BASE_URL").filter(|u| !u.is_empty()) {
            self.llm.base_url = url;
        }
        if let Some(database) = lookup("CHAT_RAG_DATABASE").filter(|d| !d.is_empty()) {
            self.storage.database = database;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(host) = lookup("CHAT_RAG_HOST").filter(|h| !h.is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = lookup("CHAT_RAG_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid CHAT_RAG_PORT value '{}'", port),
            }
        }
        if let Some(backend) = lookup("CHAT_RAG_EMBEDDINGS") {
            match backend.to_lowercase().as_str() {
                "ollama" => self.embeddings.provider = EmbeddingBackend::Ollama,
                "hash" => self.embeddings.provider = EmbeddingBackend::Hash,
                other => tracing::warn!("Ignoring unknown CHAT_RAG_EMBEDDINGS value '{}'", other),
            }
        }
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embedding dimensions must be greater than zero".into()));
        }
        if !(0.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return Err(Error::Config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.retrieval.similarity_threshold
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("top_k must be greater than zero".into()));
        }
        if self.llm.max_retries > MAX_GENERATION_RETRIES {
            return Err(Error::Config(format!(
                "llm.max_retries must be at most {}",
                MAX_GENERATION_RETRIES
            )));
        }
        if self.server.max_upload_size == 0 {
            return Err(Error::Config("max_upload_size must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Allowed cross-origin hosts ("*" allows any)
    pub allowed_origins: Vec<String>,
    /// Maximum upload size in bytes (default: 10MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec!["*".to_string()],
            max_upload_size: 10 * 1024 * 1024,
        }
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama embeddings endpoint
    #[default]
    Ollama,
    /// Local feature-hashing embedder (no network)
    Hash,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend to use
    pub provider: EmbeddingBackend,
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive windows in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks used as answer context
    pub top_k: usize,
    /// Minimum similarity (0.0-1.0) for a chunk to be used
    pub similarity_threshold: f32,
    /// Default result limit for knowledge-base search
    pub search_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.7,
            search_limit: 10,
        }
    }
}

/// Answer generator backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    /// Hosted OpenAI-compatible chat completions API
    #[default]
    Hosted,
    /// Local Ollama generate endpoint
    Ollama,
}

/// Answer generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend to use
    pub provider: GeneratorBackend,
    /// Base URL of the chat completions API (or Ollama)
    pub base_url: String,
    /// API key for the hosted API
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Nucleus sampling parameter
    pub top_p: f32,
    /// Maximum tokens in a reply
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl LlmConfig {
    /// Overall bound on one generation call, retries included
    ///
    /// Retries are capped the same way the HTTP clients cap them, so an
    /// unvalidated config still yields a finite bound.
    pub fn generation_timeout(&self) -> Duration {
        let retries = self.max_retries.min(MAX_GENERATION_RETRIES);
        let attempts = u64::from(retries) + 1;
        let backoff: u64 = (0..retries).map(|a| 2u64.pow(a)).sum();
        Duration::from_secs(self.timeout_secs.saturating_mul(attempts).saturating_add(backoff))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: GeneratorBackend::Hosted,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "gemma2-9b-it".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 500,
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Knowledge-base snapshot file (None keeps the knowledge base in memory only)
    pub snapshot_path: Option<PathBuf>,
    /// Conversation database connection string (SQLite path or ":memory:")
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chat-rag");

        Self {
            snapshot_path: Some(data_dir.join("knowledge_base.json")),
            database: data_dir.join("conversations.db").to_string_lossy().to_string(),
        }
    }
}

/// Conversation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Number of prior turns included in the prompt
    pub history_limit: usize,
    /// Default number of turns returned by the history endpoint
    pub display_limit: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_limit: 6,
            display_limit: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.server.max_upload_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RagConfig::from_toml(
            r#"
            [chunking]
            chunk_size = 500
            chunk_overlap = 50

            [retrieval]
            similarity_threshold = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.retrieval.similarity_threshold, 0.5);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.llm.model, "gemma2-9b-it");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AI_CHATBOT_API_KEY", "secret"),
            ("AI_CHATBOT_MODEL_NAME", "llama-3.1-8b-instant"),
            ("CHAT_RAG_DATABASE", ":memory:"),
            ("ALLOWED_ORIGINS", "http://localhost:3000, https://app.example.com"),
            ("CHAT_RAG_PORT", "9001"),
            ("CHAT_RAG_EMBEDDINGS", "hash"),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config.apply_env_with(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.storage.database, ":memory:");
        assert_eq!(
            config.server.allowed_origins,
            vec!["http://localhost:3000", "https://app.example.com"]
        );
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.embeddings.provider, EmbeddingBackend::Hash);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unbounded_retries_rejected() {
        let mut config = RagConfig::default();
        config.llm.max_retries = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generation_timeout_covers_retries() {
        let config = LlmConfig {
            timeout_secs: 10,
            max_retries: 1,
            ..Default::default()
        };
        assert_eq!(config.generation_timeout(), Duration::from_secs(21));
    }

    #[test]
    fn test_generation_timeout_without_validation() {
        let config = LlmConfig {
            timeout_secs: 10,
            max_retries: u32::MAX,
            ..Default::default()
        };
        // 4 attempts of 10s plus 1 + 2 + 4 seconds of backoff
        assert_eq!(config.generation_timeout(), Duration::from_secs(47));

        let config = LlmConfig {
            timeout_secs: u64::MAX,
            max_retries: 2,
            ..Default::default()
        };
        assert_eq!(config.generation_timeout(), Duration::from_secs(u64::MAX));
    }
}
