//! Pairwise relevance scoring for reranking

use async_trait::async_trait;
use crate::error::Result;

/// Trait for a query/passage relevance model
///
/// Only the relative order of scores matters: higher means more relevant.
///
/// Implementations:
/// - `OnnxCrossEncoder`: ms-marco cross-encoder on ONNX Runtime
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Score every passage against the query, one score per passage in input order
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>>;

    /// Get scorer name for logging
    fn name(&self) -> &str;
}
