//! RAG pipeline orchestration: seeding, ingestion and query
//!
//! The pipeline starts uninitialised. `initialize` flips it ready exactly
//! once; every other operation fails with `Error::NotInitialized` until then.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::{EmbeddingBackend, PipelineConfig, RagConfig};
use crate::error::{Error, Result};
use crate::generation::{AnswerGenerator, OllamaClient};
use crate::index::ChunkIndex;
use crate::ingestion::DocumentProcessor;
use crate::providers::{
    EmbeddingProvider, OllamaEmbedder, OllamaLlm, OnnxCrossEncoder, OnnxEmbedder,
    SqliteVectorStore,
};
use crate::retrieval::Reranker;
use crate::types::{Chunk, QueryResult, RankedSource};

/// What `initialize` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitReport {
    /// The pipeline was already ready; nothing happened
    AlreadyInitialized,
    /// The index already held data, so seeding was skipped
    SkippedExistingData { count: usize },
    /// The seed directory was ingested
    Seeded { chunks: usize },
    /// No seed directory, or it produced no chunks
    NoSeedData,
    /// Seeding failed but the pipeline became ready anyway
    SeedFailed { error: String },
}

/// Orchestrator behaviour knobs
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Candidates retrieved per requested result
    pub over_fetch_factor: usize,
    /// Keep the pipeline uninitialised when seeding fails
    pub fail_on_seed_error: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            over_fetch_factor: 2,
            fail_on_seed_error: false,
        }
    }
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            over_fetch_factor: config.over_fetch_factor.max(1),
            fail_on_seed_error: config.fail_on_seed_error,
        }
    }
}

/// Open the configured index with its embedding provider
///
/// Needs no relevance or completion model, so maintenance tools can use it
/// on their own.
pub async fn build_index(config: &RagConfig, client: Arc<OllamaClient>) -> Result<ChunkIndex> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::from_client(
            client,
            config.embeddings.dimensions,
        )),
        EmbeddingBackend::Onnx => Arc::new(OnnxEmbedder::new(&config.embeddings).await?),
    };
    tracing::info!("Embedding provider: {}", embedder.name());

    let store = Arc::new(SqliteVectorStore::open(&config.index.persist_directory)?);
    Ok(ChunkIndex::new(embedder, store))
}

/// Retrieval-augmented generation pipeline
pub struct RagPipeline {
    processor: DocumentProcessor,
    index: Arc<ChunkIndex>,
    reranker: Reranker,
    generator: AnswerGenerator,
    settings: PipelineSettings,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
}

impl RagPipeline {
    /// Assemble a pipeline from already-built components
    pub fn from_parts(
        processor: DocumentProcessor,
        index: Arc<ChunkIndex>,
        reranker: Reranker,
        generator: AnswerGenerator,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            processor,
            index,
            reranker,
            generator,
            settings,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    /// Build the default providers (SQLite index, Ollama or ONNX embeddings,
    /// ONNX cross-encoder, Ollama completion) from configuration
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        config.validate()?;

        let processor = DocumentProcessor::new(&config.chunking)?;
        let client = Arc::new(OllamaClient::new(&config.llm)?);
        let index = Arc::new(build_index(config, Arc::clone(&client)).await?);

        let scorer = Arc::new(OnnxCrossEncoder::new(&config.reranker).await?);
        let reranker = Reranker::new(scorer);

        let llm = Arc::new(OllamaLlm::from_client(client));
        let generator = AnswerGenerator::new(
            llm,
            Duration::from_secs(config.llm.generation_timeout_secs),
        );

        Ok(Self::from_parts(
            processor,
            index,
            reranker,
            generator,
            PipelineSettings::from(&config.pipeline),
        ))
    }

    /// Whether `initialize` has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// The underlying index
    pub fn index(&self) -> &Arc<ChunkIndex> {
        &self.index
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Make the pipeline ready, seeding an empty index from `initial_data_dir`
    ///
    /// Existing data always wins over seeding. Calling this again once ready
    /// is a logged no-op.
    pub async fn initialize(&self, initial_data_dir: Option<&Path>) -> Result<InitReport> {
        let _guard = self.init_lock.lock().await;

        if self.is_initialized() {
            tracing::info!("RAG pipeline already initialized");
            return Ok(InitReport::AlreadyInitialized);
        }

        tracing::info!("Initializing RAG pipeline...");

        let report = match self.seed(initial_data_dir).await {
            Ok(report) => report,
            Err(e) if self.settings.fail_on_seed_error => {
                tracing::error!("Initial document load failed: {}", e);
                return Err(e);
            }
            Err(e) => {
                tracing::error!("Initial document load failed, continuing without it: {}", e);
                InitReport::SeedFailed {
                    error: e.to_string(),
                }
            }
        };

        self.initialized.store(true, Ordering::Release);
        tracing::info!("RAG pipeline initialized successfully");

        Ok(report)
    }

    async fn seed(&self, initial_data_dir: Option<&Path>) -> Result<InitReport> {
        let count = self.index.count().await?;
        if count > 0 {
            tracing::info!(
                "Vector index already contains {} chunks. Skipping initial document load.",
                count
            );
            return Ok(InitReport::SkippedExistingData { count });
        }

        let Some(dir) = initial_data_dir else {
            return Ok(InitReport::NoSeedData);
        };

        tracing::info!("Vector index is empty. Loading initial documents from {}", dir.display());

        let processor = self.processor.clone();
        let dir: PathBuf = dir.to_path_buf();
        let loaded = tokio::task::spawn_blocking(move || processor.chunk_directory(&dir))
            .await
            .map_err(|e| Error::internal(format!("Directory load task failed: {}", e)))??;

        if loaded.chunks.is_empty() {
            tracing::info!("No initial documents found or processed");
            return Ok(InitReport::NoSeedData);
        }

        self.index.add(&loaded.chunks).await?;
        tracing::info!("Added {} initial chunks to the index", loaded.chunks.len());

        Ok(InitReport::Seeded {
            chunks: loaded.chunks.len(),
        })
    }

    /// Answer a question from the `top_k` most relevant chunks
    pub async fn query(&self, text: &str, top_k: usize) -> Result<QueryResult> {
        self.ensure_initialized()?;

        tracing::info!("Processing query: '{}'", text);

        let fetch = top_k.saturating_mul(self.settings.over_fetch_factor);
        let candidates = self.index.search(text, fetch).await?;
        tracing::info!("Retrieved {} candidate chunks (requested {})", candidates.len(), fetch);

        let mut ranked = self.reranker.rerank(text, candidates).await?;
        ranked.truncate(top_k);
        tracing::info!("Reranked and selected top {} chunks", ranked.len());

        let chunks: Vec<Chunk> = ranked.iter().map(|s| s.chunk.clone()).collect();
        let answer = self.generator.generate(text, &chunks).await;

        Ok(QueryResult {
            answer,
            sources: ranked.iter().map(RankedSource::from).collect(),
        })
    }

    /// Chunk a file and add it to the index; `false` when it produced no chunks
    pub async fn add_document_from_file(&self, path: &Path) -> Result<bool> {
        self.ingest_file(path, None).await
    }

    /// Like [`add_document_from_file`](Self::add_document_from_file), but every
    /// chunk cites `source` instead of the path it was read from
    pub async fn add_document_with_source(&self, path: &Path, source: &str) -> Result<bool> {
        self.ingest_file(path, Some(source)).await
    }

    async fn ingest_file(&self, path: &Path, source: Option<&str>) -> Result<bool> {
        self.ensure_initialized()?;

        tracing::info!("Adding document from file: {}", path.display());

        let processor = self.processor.clone();
        let file = path.to_path_buf();
        let mut chunks = tokio::task::spawn_blocking(move || processor.chunk_file(&file))
            .await
            .map_err(|e| Error::internal(format!("File load task failed: {}", e)))??;

        if let Some(source) = source {
            for chunk in &mut chunks {
                chunk.metadata.source = Some(source.to_string());
            }
        }

        if chunks.is_empty() {
            tracing::warn!("No chunks processed from {}", path.display());
            return Ok(false);
        }

        self.index.add(&chunks).await?;
        tracing::info!("Added {} chunks from {}", chunks.len(), path.display());
        Ok(true)
    }

    /// Every indexed chunk
    pub async fn list_documents(&self) -> Result<Vec<Chunk>> {
        self.ensure_initialized()?;
        self.index.get_all().await
    }

    /// Number of indexed chunks; available before initialisation
    pub async fn document_count(&self) -> Result<usize> {
        self.index.count().await
    }

    /// Delete duplicate-content entries; available before initialisation
    pub async fn remove_duplicates(&self) -> Result<usize> {
        self.index.remove_duplicates().await
    }
}
