//! Chat server binary
//!
//! Run with: cargo run -p chat-rag --bin chat-rag-server -- --config chat-rag.toml

use chat_rag::{config::RagConfig, server::RagServer};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chat-rag-server")]
#[command(about = "AI tutor chat with a document knowledge base", version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CHAT_RAG_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embeddings: {:?} {} ({} dims)", config.embeddings.provider, config.embeddings.model, config.embeddings.dimensions);
    tracing::info!("  - Generator: {:?} {} at {}", config.llm.provider, config.llm.model, config.llm.base_url);
    tracing::info!("  - Chunking: {} chars, {} overlap", config.chunking.chunk_size, config.chunking.chunk_overlap);
    tracing::info!("  - Retrieval: top {} above {:.2}", config.retrieval.top_k, config.retrieval.similarity_threshold);

    let server = RagServer::new(config).await?;
    tracing::info!("Health: http://{}/health", server.address());

    server.start().await?;

    Ok(())
}
