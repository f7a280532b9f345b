//! Cross-encoder reranking of retrieved candidates

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::RelevanceScorer;
use crate::types::{Chunk, ScoredChunk};

/// Re-scores candidates against the query and sorts them best first
pub struct Reranker {
    scorer: Arc<dyn RelevanceScorer>,
}

impl Reranker {
    /// Create a reranker over a relevance model
    pub fn new(scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self { scorer }
    }

    /// Score every candidate and return all of them by descending score
    ///
    /// Equal scores keep their input order. No truncation happens here.
    pub async fn rerank(&self, query: &str, candidates: Vec<Chunk>) -> Result<Vec<ScoredChunk>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let passages: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let scores = self.scorer.score(query, &passages).await?;

        if scores.len() != candidates.len() {
            return Err(Error::rerank(format!(
                "{} returned {} scores for {} candidates",
                self.scorer.name(),
                scores.len(),
                candidates.len()
            )));
        }

        let mut scored: Vec<ScoredChunk> = candidates
            .into_iter()
            .zip(scores)
            .map(|(chunk, rerank_score)| ScoredChunk {
                chunk,
                rerank_score,
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.rerank_score.total_cmp(&a.rerank_score));

        tracing::debug!(
            "Reranked {} candidates with {}, best score {:.4}",
            scored.len(),
            self.scorer.name(),
            scored[0].rerank_score
        );

        Ok(scored)
    }
}
