//! Deterministic in-process providers for tests
//!
//! Compiled for unit tests and, through the `test-util` feature, for the
//! integration tests under `tests/`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::embedding::normalize;
use crate::providers::{EmbeddingProvider, LlmProvider, RelevanceScorer};

const FAKE_DIMENSIONS: usize = 64;

/// Bag-of-words embedding: each lowercase word hashes into one of 64 buckets
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; FAKE_DIMENSIONS];
    for word in text.split_whitespace() {
        let word = word.to_lowercase();
        let bucket = word
            .bytes()
            .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
            % FAKE_DIMENSIONS;
        v[bucket] += 1.0;
    }
    normalize(&mut v);
    v
}

/// Embedder over [`bag_of_words`]
pub struct FakeEmbedder {
    reported_dimensions: usize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::reporting_dimensions(FAKE_DIMENSIONS)
    }

    /// Advertise `dimensions` while still producing 64-dimensional vectors
    pub fn reporting_dimensions(dimensions: usize) -> Self {
        Self {
            reported_dimensions: dimensions,
        }
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(bag_of_words(text))
    }

    fn dimensions(&self) -> usize {
        self.reported_dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake-embedder"
    }
}

/// Scripted completion service that records prompts
pub struct FakeLlm {
    reply: std::result::Result<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl FakeLlm {
    pub fn answering(reply: &str) -> Self {
        Self::with_reply(Ok(reply.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_reply(Err(message.to_string()))
    }

    fn with_reply(reply: std::result::Result<String, String>) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = Some(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.reply.clone().map_err(Error::llm)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake-llm"
    }

    fn model(&self) -> &str {
        "fake"
    }
}

/// Returns a fixed score list regardless of input
pub struct FixedScorer {
    scores: Vec<f32>,
    calls: AtomicUsize,
}

impl FixedScorer {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceScorer for FixedScorer {
    async fn score(&self, _query: &str, _passages: &[String]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }

    fn name(&self) -> &str {
        "fixed-scorer"
    }
}

/// Scores a passage by how many distinct query words it contains
///
/// Remembers the size of the last batch it scored.
#[derive(Default)]
pub struct OverlapScorer {
    last_batch: AtomicUsize,
}

impl OverlapScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of passages in the most recent `score` call
    pub fn last_batch(&self) -> usize {
        self.last_batch.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceScorer for OverlapScorer {
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        self.last_batch.store(passages.len(), Ordering::SeqCst);

        let query_words: HashSet<String> =
            query.split_whitespace().map(|w| w.to_lowercase()).collect();

        Ok(passages
            .iter()
            .map(|p| {
                let words: HashSet<String> =
                    p.split_whitespace().map(|w| w.to_lowercase()).collect();
                query_words.intersection(&words).count() as f32
            })
            .collect())
    }

    fn name(&self) -> &str {
        "overlap-scorer"
    }
}
