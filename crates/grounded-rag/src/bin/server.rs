//! RAG Server binary
//!
//! Run with: cargo run -p grounded-rag --bin grounded-rag-server

use std::sync::Arc;

use grounded_rag::{
    config::RagConfig, generation::OllamaClient, server::RagServer, RagPipeline,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grounded_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding backend: {:?}", config.embeddings.backend);
    tracing::info!("  - Reranker model: {}", config.reranker.model);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Index: {}", config.index.persist_directory.display());

    // Check Ollama
    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    if OllamaClient::new(&config.llm)?.health_check().await? {
        tracing::info!("Ollama is running");
    } else {
        tracing::warn!("Ollama not available at {}", config.llm.base_url);
        tracing::warn!("Please start Ollama:");
        tracing::warn!("  1. Start: ollama serve");
        tracing::warn!(
            "  2. Pull models: ollama pull {} && ollama pull {}",
            config.llm.embed_model,
            config.llm.generate_model
        );
    }

    let pipeline = Arc::new(RagPipeline::from_config(&config).await?);

    // Serve immediately; requests get 503 until seeding finishes
    let seed_dir = config.pipeline.data_dir.clone().filter(|dir| dir.is_dir());
    let init_pipeline = Arc::clone(&pipeline);
    tokio::spawn(async move {
        match init_pipeline.initialize(seed_dir.as_deref()).await {
            Ok(report) => tracing::info!("Pipeline ready: {:?}", report),
            Err(e) => tracing::error!("Failed to initialize RAG pipeline: {}", e),
        }
    });

    let server = RagServer::new(config, pipeline);

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /query            - Ask questions");
    println!("  POST /upload_document  - Upload a .txt or .pdf document");
    println!("  GET  /documents        - List indexed chunks");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
