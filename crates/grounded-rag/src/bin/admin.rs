//! Index maintenance CLI
//!
//! Run with: cargo run -p grounded-rag --features cli --bin grounded-rag-admin -- dedup

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use grounded_rag::{
    config::RagConfig, generation::OllamaClient, ingestion::DocumentProcessor,
    pipeline::build_index,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grounded-rag-admin", version, about = "Maintain the grounded-rag vector index")]
struct Cli {
    /// TOML configuration file (defaults to $GROUNDED_RAG_CONFIG, then built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Delete entries whose content duplicates an earlier entry
    Dedup,
    /// Print the number of indexed chunks
    Count,
    /// Print every indexed chunk as one JSON object per line
    List,
    /// Chunk and index a file or every supported file in a directory
    Ingest {
        /// File or directory to ingest
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grounded_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RagConfig::from_file(path)?,
        None => RagConfig::load()?,
    };

    let client = Arc::new(OllamaClient::new(&config.llm)?);
    let index = build_index(&config, client).await?;

    match cli.command {
        Command::Dedup => {
            let removed = index.remove_duplicates().await?;
            println!("Removed {} duplicate entries", removed);
        }
        Command::Count => {
            println!("{}", index.count().await?);
        }
        Command::List => {
            for chunk in index.get_all().await? {
                println!("{}", serde_json::to_string(&chunk)?);
            }
        }
        Command::Ingest { path } => {
            let processor = DocumentProcessor::new(&config.chunking)?;
            let (chunks, skipped) = if path.is_dir() {
                let loaded = processor.chunk_directory(&path)?;
                (loaded.chunks, loaded.skipped.len())
            } else {
                (processor.chunk_file(&path)?, 0)
            };

            if chunks.is_empty() {
                anyhow::bail!("No chunks produced from {}", path.display());
            }

            index.add(&chunks).await?;
            println!(
                "Indexed {} chunks from {} ({} files skipped)",
                chunks.len(),
                path.display(),
                skipped
            );
        }
    }

    Ok(())
}
