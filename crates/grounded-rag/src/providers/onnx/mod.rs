//! ONNX Runtime models: sentence embedder and cross-encoder
//!
//! Both share model download, session construction and input encoding.

mod cross_encoder;
mod embedder;

pub use cross_encoder::OnnxCrossEncoder;
pub use embedder::OnnxEmbedder;

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use tokenizers::{Encoding, Tokenizer, TruncationParams};

use crate::error::{Error, Result};

/// Local paths of a downloaded model
#[derive(Debug, Clone)]
pub(crate) struct ModelFiles {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

/// Cache directory for a Hugging Face model id
pub(crate) fn model_dir(cache_dir: &Path, model: &str) -> PathBuf {
    cache_dir.join(model.replace('/', "--"))
}

/// Download `model.onnx` and `tokenizer.json` unless already cached
pub(crate) async fn ensure_model_files(
    model: &str,
    cache_dir: &Path,
    err: fn(String) -> Error,
) -> Result<ModelFiles> {
    let dir = model_dir(cache_dir, model);
    std::fs::create_dir_all(&dir)
        .map_err(|e| Error::Config(format!("Failed to create cache directory: {}", e)))?;

    let files = ModelFiles {
        model: dir.join("model.onnx"),
        tokenizer: dir.join("tokenizer.json"),
    };

    if !files.model.exists() {
        let url = format!("https://huggingface.co/{}/resolve/main/onnx/model.onnx", model);
        download(&url, &files.model, err).await?;
    }

    if !files.tokenizer.exists() {
        let url = format!("https://huggingface.co/{}/resolve/main/tokenizer.json", model);
        download(&url, &files.tokenizer, err).await?;
    }

    Ok(files)
}

async fn download(url: &str, path: &Path, err: fn(String) -> Error) -> Result<()> {
    tracing::info!("Downloading {}", url);

    let response = reqwest::get(url)
        .await
        .map_err(|e| err(format!("Failed to download {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(err(format!(
            "Download of {} failed: HTTP {}",
            url,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| err(format!("Failed to read bytes from {}: {}", url, e)))?;

    // Write then rename so an interrupted download never looks cached
    let partial = path.with_extension("partial");
    std::fs::write(&partial, &bytes)
        .map_err(|e| err(format!("Failed to save {}: {}", path.display(), e)))?;
    std::fs::rename(&partial, path)
        .map_err(|e| err(format!("Failed to save {}: {}", path.display(), e)))?;

    tracing::info!("Saved {} ({} bytes)", path.display(), bytes.len());

    Ok(())
}

/// Build an optimised inference session
pub(crate) fn load_session(path: &Path, err: fn(String) -> Error) -> Result<Session> {
    Session::builder()
        .map_err(|e| err(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| err(format!("Failed to set optimization level: {}", e)))?
        .with_intra_threads(4)
        .map_err(|e| err(format!("Failed to set threads: {}", e)))?
        .commit_from_file(path)
        .map_err(|e| err(format!("Failed to load model: {}", e)))
}

/// Load a tokenizer that truncates to `max_length` tokens
pub(crate) fn load_tokenizer(
    path: &Path,
    max_length: usize,
    err: fn(String) -> Error,
) -> Result<Tokenizer> {
    let mut tokenizer =
        Tokenizer::from_file(path).map_err(|e| err(format!("Failed to load tokenizer: {}", e)))?;

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..TruncationParams::default()
        }))
        .map_err(|e| err(format!("Failed to configure truncation: {}", e)))?;

    Ok(tokenizer)
}

/// Padded, row-major model inputs for one batch
pub(crate) struct EncodedBatch {
    pub batch_size: usize,
    pub seq_len: usize,
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl EncodedBatch {
    /// Pad encodings to the longest one, capped at `max_length`
    pub fn from_encodings(encodings: &[Encoding], max_length: usize) -> Self {
        let batch_size = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(max_length);

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();

            for j in 0..ids.len().min(seq_len) {
                input_ids[i * seq_len + j] = ids[j] as i64;
                attention_mask[i * seq_len + j] = mask[j] as i64;
                token_type_ids[i * seq_len + j] = types[j] as i64;
            }
        }

        Self {
            batch_size,
            seq_len,
            input_ids,
            attention_mask,
            token_type_ids,
        }
    }
}

/// Run a session on a batch and copy out one output tensor
///
/// Returns the tensor shape and its flat data. `preferred_output` is used
/// when present, otherwise the first output.
pub(crate) fn run_session(
    session: &mut Session,
    batch: &EncodedBatch,
    preferred_output: &str,
    err: fn(String) -> Error,
) -> Result<(Vec<usize>, Vec<f32>)> {
    let shape = vec![batch.batch_size, batch.seq_len];
    let wants_token_types = session.inputs.iter().any(|i| i.name == "token_type_ids");

    let input_ids = Tensor::from_array((shape.clone(), batch.input_ids.clone().into_boxed_slice()))
        .map_err(|e| err(format!("Input tensor creation failed: {}", e)))?;
    let attention_mask =
        Tensor::from_array((shape.clone(), batch.attention_mask.clone().into_boxed_slice()))
            .map_err(|e| err(format!("Attention mask tensor creation failed: {}", e)))?;

    let mut inputs = vec![
        ("input_ids", input_ids.into_dyn()),
        ("attention_mask", attention_mask.into_dyn()),
    ];

    if wants_token_types {
        let token_type_ids =
            Tensor::from_array((shape, batch.token_type_ids.clone().into_boxed_slice()))
                .map_err(|e| err(format!("Token type tensor creation failed: {}", e)))?;
        inputs.push(("token_type_ids", token_type_ids.into_dyn()));
    }

    let outputs = session
        .run(inputs)
        .map_err(|e| err(format!("Inference failed: {}", e)))?;

    let output_iter: Vec<_> = outputs.iter().collect();
    let output = output_iter
        .iter()
        .find(|(name, _)| *name == preferred_output)
        .or_else(|| output_iter.first())
        .map(|(_, v)| v)
        .ok_or_else(|| err("No output tensor".to_string()))?;

    let (tensor_shape, tensor_data) = output
        .try_extract_tensor::<f32>()
        .map_err(|e| err(format!("Failed to extract tensor: {}", e)))?;

    let dims: Vec<usize> = tensor_shape.iter().map(|&d| d as usize).collect();
    Ok((dims, tensor_data.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_dir_flattens_repo_id() {
        let dir = model_dir(Path::new("/cache"), "cross-encoder/ms-marco-TinyBERT-L2-v2");
        assert_eq!(dir, PathBuf::from("/cache/cross-encoder--ms-marco-TinyBERT-L2-v2"));
    }
}
