//! Second-stage retrieval

mod reranker;

pub use reranker::Reranker;
