//! grounded-rag: retrieval-augmented generation with source-grounded answers
//!
//! Documents are split into overlapping chunks, embedded and stored under the
//! hash of their content, so re-ingesting a corpus never duplicates entries.
//! Queries over-fetch candidates from the index, rerank them with a
//! cross-encoder, and hand the best ones to a language model that must cite
//! the source of every chunk it is given.

pub mod config;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use index::ChunkIndex;
pub use pipeline::{InitReport, PipelineSettings, RagPipeline};
pub use types::{Chunk, ChunkMetadata, QueryRequest, QueryResponse, QueryResult, ScoredChunk};
