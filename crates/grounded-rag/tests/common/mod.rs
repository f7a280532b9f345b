//! Pipeline builders shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use grounded_rag::config::ChunkingConfig;
use grounded_rag::generation::AnswerGenerator;
use grounded_rag::ingestion::DocumentProcessor;
use grounded_rag::providers::SqliteVectorStore;
use grounded_rag::retrieval::Reranker;
use grounded_rag::testing::{FakeEmbedder, FakeLlm, OverlapScorer};
use grounded_rag::{ChunkIndex, PipelineSettings, RagPipeline};

/// Pipeline over `store` with the given chunking and scorer
pub fn pipeline_with(
    chunking: ChunkingConfig,
    store: Arc<SqliteVectorStore>,
    llm: Arc<FakeLlm>,
    scorer: Arc<OverlapScorer>,
) -> RagPipeline {
    let index = Arc::new(ChunkIndex::new(Arc::new(FakeEmbedder::new()), store));

    RagPipeline::from_parts(
        DocumentProcessor::new(&chunking).unwrap(),
        index,
        Reranker::new(scorer),
        AnswerGenerator::new(llm, Duration::from_secs(5)),
        PipelineSettings::default(),
    )
}

/// Pipeline over an in-memory store with default chunking (1000 / 200)
pub fn pipeline(llm: Arc<FakeLlm>) -> RagPipeline {
    let store = Arc::new(SqliteVectorStore::in_memory().unwrap());
    pipeline_with(
        ChunkingConfig::default(),
        store,
        llm,
        Arc::new(OverlapScorer::new()),
    )
}

/// 26-letter repeating text of `len` characters, no whitespace
pub fn alphabet_text(len: usize) -> String {
    (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect()
}
