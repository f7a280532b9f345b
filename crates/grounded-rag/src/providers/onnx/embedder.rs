//! Sentence embeddings on ONNX Runtime (mean pooling, L2-normalised)

use async_trait::async_trait;
use ort::session::Session;
use parking_lot::Mutex;
use std::sync::Arc;
use tokenizers::Tokenizer;

use super::{ensure_model_files, load_session, load_tokenizer, run_session, EncodedBatch};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::embedding::{normalize, EmbeddingProvider};

struct EmbedderModel {
    session: Session,
    tokenizer: Tokenizer,
    max_length: usize,
    batch_size: usize,
}

impl EmbedderModel {
    fn embed_batch(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size.max(1)) {
            all_embeddings.extend(self.embed_batch_internal(batch)?);
        }

        Ok(all_embeddings)
    }

    fn embed_batch_internal(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::embedding(format!("Tokenization failed: {}", e)))?;

        let batch = EncodedBatch::from_encodings(&encodings, self.max_length);
        let (dims, data) =
            run_session(&mut self.session, &batch, "last_hidden_state", Error::Embedding)?;

        let hidden_size = dims
            .get(2)
            .copied()
            .ok_or_else(|| Error::embedding(format!("Unexpected output shape {:?}", dims)))?;

        Ok((0..batch.batch_size)
            .map(|i| mean_pool(&data, &batch, i, hidden_size))
            .collect())
    }
}

/// Attention-masked mean over token vectors of row `row`, then L2-normalised
fn mean_pool(data: &[f32], batch: &EncodedBatch, row: usize, hidden_size: usize) -> Vec<f32> {
    let seq_len = batch.seq_len;
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0.0f32;

    for j in 0..seq_len {
        let mask_val = batch.attention_mask[row * seq_len + j] as f32;
        if mask_val > 0.0 {
            let base = row * seq_len * hidden_size + j * hidden_size;
            for (k, value) in sum.iter_mut().enumerate() {
                if let Some(x) = data.get(base + k) {
                    *value += x * mask_val;
                }
            }
            count += mask_val;
        }
    }

    if count > 0.0 {
        for value in &mut sum {
            *value /= count;
        }
    }

    normalize(&mut sum);
    sum
}

/// ONNX-based text embedder
pub struct OnnxEmbedder {
    model: Arc<Mutex<EmbedderModel>>,
    dimensions: usize,
}

impl OnnxEmbedder {
    /// Download (if needed) and load the configured model
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        let files = ensure_model_files(&config.model, &config.cache_dir, Error::Embedding).await?;
        let max_length = config.max_length;
        let batch_size = config.batch_size;

        let (model, dimensions) =
            tokio::task::spawn_blocking(move || -> Result<(EmbedderModel, usize)> {
                let mut model = EmbedderModel {
                    session: load_session(&files.model, Error::Embedding)?,
                    tokenizer: load_tokenizer(&files.tokenizer, max_length, Error::Embedding)?,
                    max_length,
                    batch_size,
                };
                // Hidden size comes from the model, not from configuration
                let dimensions = model
                    .embed_batch(&["dimension check".to_string()])?
                    .first()
                    .map(Vec::len)
                    .ok_or_else(|| Error::embedding("Model returned no embedding"))?;
                Ok((model, dimensions))
            })
            .await
            .map_err(|e| Error::internal(format!("Embedder load task failed: {}", e)))??;

        if dimensions != config.dimensions {
            tracing::warn!(
                "Model {} produces {}-dimensional embeddings, overriding configured {}",
                config.model,
                dimensions,
                config.dimensions
            );
        }

        tracing::info!("ONNX embedder initialized ({} dimensions)", dimensions);

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("Empty embedding result"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || model.lock().embed_batch(&texts))
            .await
            .map_err(|e| Error::internal(format!("Embedding task failed: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding() {
        // one row, three positions, last one padded; hidden size 2
        let batch = EncodedBatch {
            batch_size: 1,
            seq_len: 3,
            input_ids: vec![101, 7, 0],
            attention_mask: vec![1, 1, 0],
            token_type_ids: vec![0, 0, 0],
        };
        let data = vec![1.0, 0.0, 3.0, 0.0, 100.0, 100.0];

        let pooled = mean_pool(&data, &batch, 0, 2);
        assert!((pooled[0] - 1.0).abs() < 1e-6);
        assert!(pooled[1].abs() < 1e-6);
    }
}
