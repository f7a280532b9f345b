//! Provider abstractions for embeddings, completion, relevance scoring and vector storage
//!
//! Trait-based seams so the pipeline can run against Ollama, ONNX Runtime
//! and SQLite in production and against in-process fakes in tests.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod onnx;
pub mod relevance;
pub mod sqlite;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use onnx::{OnnxCrossEncoder, OnnxEmbedder};
pub use relevance::RelevanceScorer;
pub use sqlite::SqliteVectorStore;
pub use vector_store::{IndexedEntry, StoredEntry, VectorSearchResult, VectorStoreProvider};
