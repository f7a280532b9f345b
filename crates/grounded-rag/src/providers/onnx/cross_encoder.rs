//! Cross-encoder relevance scoring on ONNX Runtime

use async_trait::async_trait;
use ort::session::Session;
use parking_lot::Mutex;
use std::sync::Arc;
use tokenizers::Tokenizer;

use super::{ensure_model_files, load_session, load_tokenizer, run_session, EncodedBatch};
use crate::config::RerankerConfig;
use crate::error::{Error, Result};
use crate::providers::relevance::RelevanceScorer;

struct CrossEncoderModel {
    session: Session,
    tokenizer: Tokenizer,
    max_length: usize,
    batch_size: usize,
}

impl CrossEncoderModel {
    fn score(&mut self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(passages.len());

        for batch in passages.chunks(self.batch_size.max(1)) {
            let pairs: Vec<(String, String)> = batch
                .iter()
                .map(|passage| (query.to_string(), passage.clone()))
                .collect();

            let encodings = self
                .tokenizer
                .encode_batch(pairs, true)
                .map_err(|e| Error::rerank(format!("Tokenization failed: {}", e)))?;

            let encoded = EncodedBatch::from_encodings(&encodings, self.max_length);
            let (dims, data) = run_session(&mut self.session, &encoded, "logits", Error::Rerank)?;

            scores.extend(first_logits(&dims, &data, encoded.batch_size)?);
        }

        Ok(scores)
    }
}

/// First logit of each row of a `[batch, labels]` output
fn first_logits(dims: &[usize], data: &[f32], batch_size: usize) -> Result<Vec<f32>> {
    let labels = dims.get(1).copied().unwrap_or(1).max(1);

    (0..batch_size)
        .map(|i| {
            data.get(i * labels)
                .copied()
                .ok_or_else(|| Error::rerank(format!("Output too short for shape {:?}", dims)))
        })
        .collect()
}

/// ms-marco style cross-encoder scoring (query, passage) pairs jointly
pub struct OnnxCrossEncoder {
    model: Arc<Mutex<CrossEncoderModel>>,
    name: String,
}

impl OnnxCrossEncoder {
    /// Download (if needed) and load the configured cross-encoder
    pub async fn new(config: &RerankerConfig) -> Result<Self> {
        tracing::info!("Initializing cross-encoder with model: {}", config.model);

        let files = ensure_model_files(&config.model, &config.cache_dir, Error::Rerank).await?;
        let max_length = config.max_length;
        let batch_size = config.batch_size;

        let model = tokio::task::spawn_blocking(move || -> Result<CrossEncoderModel> {
            Ok(CrossEncoderModel {
                session: load_session(&files.model, Error::Rerank)?,
                tokenizer: load_tokenizer(&files.tokenizer, max_length, Error::Rerank)?,
                max_length,
                batch_size,
            })
        })
        .await
        .map_err(|e| Error::internal(format!("Cross-encoder load task failed: {}", e)))??;

        tracing::info!("Cross-encoder initialized successfully");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            name: config.model.clone(),
        })
    }
}

#[async_trait]
impl RelevanceScorer for OnnxCrossEncoder {
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let query = query.to_string();
        let passages = passages.to_vec();

        tokio::task::spawn_blocking(move || model.lock().score(&query, &passages))
            .await
            .map_err(|e| Error::internal(format!("Rerank task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}
