//! Core types for the RAG pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{content_hash, Chunk, ChunkMetadata, ScoredChunk};
pub use query::QueryRequest;
pub use response::{QueryResponse, QueryResult, RankedSource};
