//! Response types for pipeline queries and the HTTP API

use serde::{Deserialize, Serialize};

use super::document::{Chunk, ChunkMetadata, ScoredChunk};

/// Metadata of a chunk used in an answer, with its rerank score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSource {
    /// Chunk metadata
    #[serde(flatten)]
    pub metadata: ChunkMetadata,
    /// Score assigned by the reranker
    pub rerank_score: f32,
}

impl From<&ScoredChunk> for RankedSource {
    fn from(scored: &ScoredChunk) -> Self {
        Self {
            metadata: scored.chunk.metadata.clone(),
            rerank_score: scored.rerank_score,
        }
    }
}

/// Result of a pipeline query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Generated (or fallback) answer text
    pub answer: String,
    /// Sources of the chunks handed to the generator, best first
    pub sources: Vec<RankedSource>,
}

/// Body of `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Echo of the question
    pub query: String,
    /// Answer text
    pub response: String,
    /// Sources used for the answer
    pub sources: Vec<RankedSource>,
}

impl QueryResponse {
    /// Shape a pipeline result for the API
    pub fn new(query: String, result: QueryResult) -> Self {
        Self {
            query,
            response: result.answer,
            sources: result.sources,
        }
    }
}

/// One indexed chunk as listed by `GET /documents`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentView {
    /// Chunk text
    pub page_content: String,
    /// Chunk metadata
    pub metadata: ChunkMetadata,
}

impl From<Chunk> for DocumentView {
    fn from(chunk: Chunk) -> Self {
        Self {
            page_content: chunk.content,
            metadata: chunk.metadata,
        }
    }
}

/// Body of `GET /documents`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    /// Every indexed chunk
    pub documents: Vec<DocumentView>,
}

/// Body of a successful `POST /upload_document`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Human-readable outcome
    pub message: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Process status, always "ok" when the server answers
    pub status: String,
    /// "initialized" or "not_initialized"
    pub rag_pipeline_status: String,
}

impl HealthResponse {
    /// Health for the given readiness state
    pub fn new(initialized: bool) -> Self {
        let pipeline_status = if initialized {
            "initialized"
        } else {
            "not_initialized"
        };

        Self {
            status: "ok".to_string(),
            rag_pipeline_status: pipeline_status.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ranked_source_keeps_metadata_flat() {
        let source = RankedSource {
            metadata: ChunkMetadata::with_source("data/oils.txt").with_field("start_index", 800),
            rerank_score: 0.5,
        };

        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(
            value,
            json!({"source": "data/oils.txt", "start_index": 800, "rerank_score": 0.5})
        );
    }

    #[test]
    fn test_health_status_strings() {
        assert_eq!(HealthResponse::new(true).rag_pipeline_status, "initialized");
        assert_eq!(HealthResponse::new(false).rag_pipeline_status, "not_initialized");
        assert_eq!(HealthResponse::new(false).status, "ok");
    }
}
