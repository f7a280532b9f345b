//! SQLite-backed vector store with exact cosine search
//!
//! One table keyed by content hash. Rows keep their rowid across upserts, so
//! enumeration order is first-insertion order.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::ChunkMetadata;

use super::vector_store::{IndexedEntry, StoredEntry, VectorSearchResult, VectorStoreProvider};

/// File name of the index inside the persist directory
pub const INDEX_FILE_NAME: &str = "index.sqlite3";

/// SQLite vector store
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVectorStore {
    /// Create or open the store under `persist_directory`
    pub fn open<P: AsRef<Path>>(persist_directory: P) -> Result<Self> {
        let dir = persist_directory.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::vector_db(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let path = dir.join(INDEX_FILE_NAME);
        let conn = Connection::open(&path)
            .map_err(|e| Error::vector_db(format!("Failed to open {}: {}", path.display(), e)))?;

        tracing::info!("Opened vector index at {}", path.display());
        Self::with_connection(conn)
    }

    /// Create a store that lives only as long as this value
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::vector_db(format!("Failed to open in-memory database: {}", e))
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // Every write must be on disk before the call returns
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=FULL;
            PRAGMA temp_store=MEMORY;
        "#,
        )
        .map_err(|e| Error::vector_db(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                content TEXT,
                metadata TEXT,
                embedding BLOB NOT NULL
            );
        "#,
        )
        .map_err(|e| Error::vector_db(format!("Failed to create schema: {}", e)))?;

        Ok(())
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&mut conn.lock()))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }
}

fn upsert_entries(conn: &mut Connection, entries: &[IndexedEntry]) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO chunks (id, content, metadata, embedding) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                metadata = excluded.metadata,
                embedding = excluded.embedding",
        )?;

        for entry in entries {
            let metadata = serde_json::to_string(&entry.chunk.metadata)?;
            stmt.execute(params![
                entry.id,
                entry.chunk.content,
                metadata,
                encode_embedding(&entry.embedding),
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

type Row = (String, Option<String>, Option<String>, Option<Vec<u8>>);

fn read_rows(conn: &Connection, with_embeddings: bool) -> Result<Vec<Row>> {
    let sql = if with_embeddings {
        "SELECT id, content, metadata, embedding FROM chunks ORDER BY rowid"
    } else {
        "SELECT id, content, metadata, NULL FROM chunks ORDER BY rowid"
    };

    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<std::result::Result<Vec<Row>, _>>()?;
    Ok(rows)
}

fn to_stored(id: String, content: Option<String>, metadata: Option<String>) -> StoredEntry {
    let metadata = metadata.and_then(|raw| match serde_json::from_str::<ChunkMetadata>(&raw) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::warn!("Unreadable metadata on entry {}: {}", id, e);
            None
        }
    });

    StoredEntry {
        id,
        content,
        metadata,
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity, 0.0 when either vector is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStoreProvider for SqliteVectorStore {
    async fn upsert(&self, entries: Vec<IndexedEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.with_conn(move |conn| upsert_entries(conn, &entries)).await
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let query = embedding.to_vec();

        self.with_conn(move |conn| {
            let mut skipped = 0usize;
            let mut results = Vec::new();

            for (id, content, metadata, blob) in read_rows(conn, true)? {
                let stored = decode_embedding(blob.as_deref().unwrap_or_default());
                if stored.len() != query.len() {
                    skipped += 1;
                    continue;
                }

                results.push(VectorSearchResult {
                    similarity: cosine_similarity(&query, &stored),
                    entry: to_stored(id, content, metadata),
                });
            }

            if skipped > 0 {
                tracing::warn!(
                    "Skipped {} entries whose embedding dimension differs from the query ({})",
                    skipped,
                    query.len()
                );
            }

            // Stable: equal scores keep insertion order
            results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
            results.truncate(top_k);
            Ok(results)
        })
        .await
    }

    async fn scan(&self) -> Result<Vec<StoredEntry>> {
        self.with_conn(|conn| {
            Ok(read_rows(conn, false)?
                .into_iter()
                .map(|(id, content, metadata, _)| to_stored(id, content, metadata))
                .collect())
        })
        .await
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids = ids.to_vec();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut deleted = 0;
            {
                let mut stmt = tx.prepare_cached("DELETE FROM chunks WHERE id = ?1")?;
                for id in &ids {
                    deleted += stmt.execute(params![id])?;
                }
            }
            tx.commit()?;
            Ok(deleted)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()))
            .await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
