//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming a TOML configuration file
pub const CONFIG_ENV_VAR: &str = "GROUNDED_RAG_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Vector index configuration
    pub index: IndexConfig,
    /// Cross-encoder configuration
    pub reranker: RerankerConfig,
    /// Orchestrator configuration
    pub pipeline: PipelineConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `GROUNDED_RAG_CONFIG` if set, defaults otherwise
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                tracing::info!("Loading configuration from {}", PathBuf::from(&path).display());
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.pipeline.over_fetch_factor == 0 {
            return Err(Error::Config("pipeline.over_fetch_factor must be at least 1".into()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024,
        }
    }
}

/// Which embedding backend to construct
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Ollama `/api/embeddings`
    #[default]
    Ollama,
    /// Local ONNX Runtime model
    Onnx,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend selection
    pub backend: EmbeddingBackend,
    /// Hugging Face model for the ONNX backend
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length
    pub max_length: usize,
    /// Cache directory for models
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Ollama,
            model: "BAAI/bge-small-en-v1.5".to_string(),
            dimensions: 768,
            batch_size: 32,
            max_length: 512,
            cache_dir: default_model_cache(),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Upper bound on one full answer generation, retries included
    pub generation_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "mistral".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 2,
            generation_timeout_secs: 300,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the persisted index
    pub persist_directory: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let persist_directory = dirs::data_local_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
            .join("grounded-rag")
            .join("index");

        Self { persist_directory }
    }
}

/// Cross-encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    /// Hugging Face cross-encoder model
    pub model: String,
    /// Maximum pair length in tokens
    pub max_length: usize,
    /// Pairs scored per inference call
    pub batch_size: usize,
    /// Cache directory for models
    pub cache_dir: PathBuf,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            model: "cross-encoder/ms-marco-TinyBERT-L2-v2".to_string(),
            max_length: 512,
            batch_size: 16,
            cache_dir: default_model_cache(),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory seeded into an empty index at startup
    pub data_dir: Option<PathBuf>,
    /// Scratch directory for uploaded files
    pub uploads_dir: PathBuf,
    /// Candidates retrieved per final result
    pub over_fetch_factor: usize,
    /// Keep the pipeline unready when seeding fails
    pub fail_on_seed_error: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: Some(PathBuf::from("data")),
            uploads_dir: std::env::temp_dir().join("grounded-rag-uploads"),
            over_fetch_factor: 2,
            fail_on_seed_error: false,
        }
    }
}

fn default_model_cache() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("grounded-rag")
        .join("models")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.pipeline.over_fetch_factor, 2);
        assert!(!config.pipeline.fail_on_seed_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RagConfig::from_toml_str(
            r#"
            [chunking]
            chunk_size = 500
            chunk_overlap = 50

            [embeddings]
            backend = "onnx"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.embeddings.backend, EmbeddingBackend::Onnx);
        assert_eq!(config.llm.generate_model, "mistral");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let err = RagConfig::from_toml_str(
            r#"
            [chunking]
            chunk_size = 200
            chunk_overlap = 200
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
