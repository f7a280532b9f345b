//! Content-addressed chunk index
//!
//! Every chunk is stored under the hash of its content, so adding the same
//! text twice replaces the entry instead of duplicating it. Writers (`add`,
//! `remove_duplicates`) are serialised against readers through an async
//! read/write gate.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, IndexedEntry, VectorStoreProvider};
use crate::types::{content_hash, Chunk};

/// Vector index keyed by content hash
pub struct ChunkIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    gate: RwLock<()>,
}

impl ChunkIndex {
    /// Create an index over an embedder and a store
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStoreProvider>) -> Self {
        Self {
            embedder,
            store,
            gate: RwLock::new(()),
        }
    }

    /// Reject vectors whose length differs from what the embedder advertises
    fn check_dimensions(&self, embedding: &[f32]) -> Result<()> {
        let expected = self.embedder.dimensions();
        if embedding.len() != expected {
            return Err(Error::embedding(format!(
                "{} produced a {}-dimensional vector, expected {}",
                self.embedder.name(),
                embedding.len(),
                expected
            )));
        }
        Ok(())
    }

    /// Embed and upsert chunks under their content hash
    ///
    /// Chunks repeated within `chunks` collapse to the last occurrence.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        for chunk in chunks {
            chunk.metadata.validate()?;
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }

        for embedding in &embeddings {
            self.check_dimensions(embedding)?;
        }

        let entries: Vec<IndexedEntry> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedEntry {
                id: chunk.content_hash(),
                chunk: chunk.clone(),
                embedding,
            })
            .collect();

        let _write = self.gate.write().await;
        self.store.upsert(entries).await?;

        tracing::info!("Added {} chunks to the index", chunks.len());
        Ok(())
    }

    /// The `k` chunks nearest to `query`
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        self.check_dimensions(&embedding)?;

        let _read = self.gate.read().await;
        let results = self.store.query(&embedding, k).await?;

        tracing::debug!("Search returned {} of {} requested chunks", results.len(), k);

        Ok(results.into_iter().map(|r| r.entry.into_chunk()).collect())
    }

    /// Every stored chunk, in storage order
    pub async fn get_all(&self) -> Result<Vec<Chunk>> {
        let _read = self.gate.read().await;
        let entries = self.store.scan().await?;
        Ok(entries.into_iter().map(|e| e.into_chunk()).collect())
    }

    /// Number of stored entries
    pub async fn count(&self) -> Result<usize> {
        let _read = self.gate.read().await;
        self.store.count().await
    }

    /// Delete entries whose content repeats an earlier entry, returning how many were removed
    ///
    /// Entries without content are left alone.
    pub async fn remove_duplicates(&self) -> Result<usize> {
        let _write = self.gate.write().await;

        let entries = self.store.scan().await?;
        let total = entries.len();

        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();

        for entry in entries {
            let content = match entry.content.as_deref() {
                Some(content) if !content.is_empty() => content,
                _ => continue,
            };

            if !seen.insert(content_hash(content)) {
                duplicates.push(entry.id);
            }
        }

        if duplicates.is_empty() {
            tracing::info!("No duplicates found among {} entries", total);
            return Ok(0);
        }

        let removed = self.store.delete(&duplicates).await?;
        tracing::info!("Removed {} duplicate entries out of {}", removed, total);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::SqliteVectorStore;
    use crate::testing::FakeEmbedder;
    use crate::types::ChunkMetadata;
    use serde_json::json;

    fn index() -> (ChunkIndex, Arc<SqliteVectorStore>) {
        let store = Arc::new(SqliteVectorStore::in_memory().unwrap());
        let index = ChunkIndex::new(Arc::new(FakeEmbedder::new()), store.clone());
        (index, store)
    }

    fn chunk(content: &str) -> Chunk {
        Chunk::new(content, ChunkMetadata::with_source("products.txt"))
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (index, _) = index();
        let chunks = vec![chunk("Oat milk is vegan."), chunk("Honey is not vegan.")];

        index.add(&chunks).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);

        index.add(&chunks[..1]).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_add_empty_is_noop() {
        let (index, _) = index();
        index.add(&[]).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(index.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_nested_metadata() {
        let (index, _) = index();
        let bad = Chunk::new(
            "text",
            ChunkMetadata::with_source("a.txt").with_field("tags", json!({"a": 1})),
        );

        assert!(matches!(index.add(&[bad]).await, Err(Error::InvalidMetadata(_))));
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_rejects_wrong_dimensions() {
        let store = Arc::new(SqliteVectorStore::in_memory().unwrap());
        let index = ChunkIndex::new(Arc::new(FakeEmbedder::reporting_dimensions(384)), store);

        let err = index.add(&[chunk("Oat milk is vegan.")]).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert_eq!(index.count().await.unwrap(), 0);

        assert!(index.search("oat milk", 3).await.is_err());
    }

    #[tokio::test]
    async fn test_search_finds_matching_chunk() {
        let (index, _) = index();
        index
            .add(&[
                chunk("vegan oat milk"),
                chunk("salted butter"),
                chunk("dark chocolate"),
            ])
            .await
            .unwrap();

        let results = index.search("vegan oat milk", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "vegan oat milk");
        assert_eq!(results[0].metadata.source(), Some("products.txt"));
    }

    #[tokio::test]
    async fn test_remove_duplicates_keeps_first_occurrence() {
        let (index, store) = index();
        let entry = |id: &str, content: &str| IndexedEntry {
            id: id.to_string(),
            chunk: chunk(content),
            embedding: vec![1.0, 0.0],
        };

        // rows written by a tool that did not key on content
        store
            .upsert(vec![
                entry("legacy-1", "A"),
                entry("legacy-2", "A"),
                entry("legacy-3", "B"),
                entry("legacy-4", "A"),
            ])
            .await
            .unwrap();
        let before = index.count().await.unwrap();

        let removed = index.remove_duplicates().await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(index.count().await.unwrap(), before - 2);
        let ids: Vec<String> = store.scan().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["legacy-1", "legacy-3"]);
    }

    #[tokio::test]
    async fn test_remove_duplicates_skips_empty_content() {
        let (index, store) = index();
        store
            .upsert(vec![
                IndexedEntry {
                    id: "e1".to_string(),
                    chunk: Chunk::new("", ChunkMetadata::default()),
                    embedding: vec![1.0],
                },
                IndexedEntry {
                    id: "e2".to_string(),
                    chunk: Chunk::new("", ChunkMetadata::default()),
                    embedding: vec![1.0],
                },
            ])
            .await
            .unwrap();

        assert_eq!(index.remove_duplicates().await.unwrap(), 0);
        assert_eq!(index.count().await.unwrap(), 2);
    }
}
