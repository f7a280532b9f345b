//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{Chunk, ChunkMetadata};

/// An entry written to the store, keyed by the chunk's content hash
#[derive(Debug, Clone)]
pub struct IndexedEntry {
    /// Content hash of the chunk
    pub id: String,
    /// The chunk itself
    pub chunk: Chunk,
    /// Normalised embedding of the chunk content
    pub embedding: Vec<f32>,
}

/// Raw entry as read back from the store
///
/// Content and metadata may be missing for rows written by other tools.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Storage identifier
    pub id: String,
    /// Stored text, if any
    pub content: Option<String>,
    /// Stored metadata, if any
    pub metadata: Option<ChunkMetadata>,
}

impl StoredEntry {
    /// Convert to a chunk, substituting empty content and metadata
    pub fn into_chunk(self) -> Chunk {
        Chunk::new(self.content.unwrap_or_default(), self.metadata.unwrap_or_default())
    }
}

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched entry
    pub entry: StoredEntry,
    /// Cosine similarity (higher is more similar)
    pub similarity: f32,
}

/// Trait for durable vector storage and similarity search
///
/// Implementations:
/// - `SqliteVectorStore`: single-file SQLite store with exact cosine search
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert or fully replace entries by id; durable when this returns
    async fn upsert(&self, entries: Vec<IndexedEntry>) -> Result<()>;

    /// The `top_k` nearest entries, best first
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>>;

    /// Every entry in storage enumeration order
    async fn scan(&self) -> Result<Vec<StoredEntry>>;

    /// Delete entries by id, returning how many existed
    async fn delete(&self, ids: &[String]) -> Result<usize>;

    /// Get total number of vectors stored
    async fn count(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.count().await? == 0)
    }

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
