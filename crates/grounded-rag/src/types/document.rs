//! Chunk and metadata types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Metadata attached to a chunk
///
/// `source` is the only field the pipeline interprets; everything else
/// (page numbers, start offsets, caller-supplied tags) rides along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// File path or identifier of the originating document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Open extension fields, scalars only
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChunkMetadata {
    /// Metadata with a known source
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            extra: Map::new(),
        }
    }

    /// Builder-style extension field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Source if present and non-empty
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Whether this chunk can be attributed to a document
    pub fn has_source(&self) -> bool {
        self.source().is_some()
    }

    /// Look up an extension field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Ensure every extension value is a JSON scalar
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.extra {
            if key == "source" {
                return Err(Error::InvalidMetadata(
                    "'source' must be set through the typed field".to_string(),
                ));
            }
            if value.is_array() || value.is_object() {
                return Err(Error::InvalidMetadata(format!(
                    "field '{}' must be a scalar, got {}",
                    key, value
                )));
            }
        }
        Ok(())
    }
}

/// A bounded text segment, the unit of indexing and retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content
    pub content: String,
    /// Attribution and loader metadata
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Storage identifier derived from the content
    pub fn content_hash(&self) -> String {
        content_hash(&self.content)
    }
}

/// A chunk with the score assigned by the reranker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The chunk
    pub chunk: Chunk,
    /// Pairwise relevance score, higher is more relevant
    pub rerank_score: f32,
}

/// 128-bit content digest: the first 16 bytes of SHA-256, hex encoded
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(&digest[..16])
}
