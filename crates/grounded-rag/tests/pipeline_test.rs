//! End-to-end pipeline behaviour over real files and a real SQLite store

mod common;

use std::sync::Arc;

use grounded_rag::config::ChunkingConfig;
use grounded_rag::generation::prompt::NO_CONTEXT_MESSAGE;
use grounded_rag::providers::SqliteVectorStore;
use grounded_rag::InitReport;
use serde_json::json;
use tempfile::TempDir;

use common::{alphabet_text, pipeline, pipeline_with};
use grounded_rag::testing::{FakeLlm, OverlapScorer};

#[tokio::test]
async fn test_ingest_and_query_single_file() {
    let data = TempDir::new().unwrap();
    let path = data.path().join("alphabet.txt");
    std::fs::write(&path, alphabet_text(1500)).unwrap();

    let llm = Arc::new(FakeLlm::answering("It is the alphabet [alphabet.txt]."));
    let rag = pipeline(llm.clone());

    let report = rag.initialize(Some(data.path())).await.unwrap();
    assert_eq!(report, InitReport::Seeded { chunks: 2 });

    let documents = rag.list_documents().await.unwrap();
    assert_eq!(documents.len(), 2);
    let mut starts: Vec<u64> = documents
        .iter()
        .map(|d| d.metadata.get("start_index").unwrap().as_u64().unwrap())
        .collect();
    starts.sort_unstable();
    assert_eq!(starts, vec![0, 800]);

    let result = rag.query("what letters are used?", 3).await.unwrap();
    assert_eq!(result.answer, "It is the alphabet [alphabet.txt].");
    assert!(!result.sources.is_empty() && result.sources.len() <= 3);

    let expected_source = path.to_string_lossy().to_string();
    for source in &result.sources {
        assert_eq!(source.metadata.source(), Some(expected_source.as_str()));
    }
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_reingesting_a_file_does_not_duplicate() {
    let data = TempDir::new().unwrap();
    let path = data.path().join("oats.txt");
    std::fs::write(&path, "Oats are a whole grain rich in soluble fibre.").unwrap();

    let rag = pipeline(Arc::new(FakeLlm::answering("ok")));
    rag.initialize(None).await.unwrap();

    assert!(rag.add_document_from_file(&path).await.unwrap());
    assert!(rag.add_document_from_file(&path).await.unwrap());

    assert_eq!(rag.document_count().await.unwrap(), 1);
    assert_eq!(rag.remove_duplicates().await.unwrap(), 0);
}

#[tokio::test]
async fn test_best_reranked_source_comes_first() {
    let data = TempDir::new().unwrap();
    std::fs::write(
        data.path().join("salt.txt"),
        "Adults should limit salt to about six grams per day.",
    )
    .unwrap();
    std::fs::write(
        data.path().join("sugar.txt"),
        "Free sugars should stay below ten percent of energy intake.",
    )
    .unwrap();
    std::fs::write(
        data.path().join("fibre.txt"),
        "Whole grains and legumes are good sources of dietary fibre.",
    )
    .unwrap();

    let rag = pipeline(Arc::new(FakeLlm::answering("Limit salt [salt.txt].")));
    rag.initialize(Some(data.path())).await.unwrap();

    let result = rag.query("how much salt per day", 3).await.unwrap();

    assert_eq!(result.sources.len(), 3);
    let source = result.sources[0].metadata.source().unwrap();
    assert!(source.ends_with("salt.txt"), "unexpected source {}", source);
    assert!(result.sources[0].rerank_score > 0.0);
}

#[tokio::test]
async fn test_empty_index_answers_without_completion() {
    let llm = Arc::new(FakeLlm::answering("should not be used"));
    let rag = pipeline(llm.clone());
    rag.initialize(None).await.unwrap();

    let result = rag.query("anything at all?", 3).await.unwrap();

    assert_eq!(result.answer, NO_CONTEXT_MESSAGE);
    assert!(result.sources.is_empty());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_operations_wait_for_initialize() {
    let rag = pipeline(Arc::new(FakeLlm::answering("ok")));

    assert!(rag.query("q", 3).await.unwrap_err().is_not_initialized());
    assert!(rag.list_documents().await.unwrap_err().is_not_initialized());
    assert_eq!(rag.document_count().await.unwrap(), 0);

    rag.initialize(None).await.unwrap();
    assert!(rag.list_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_persisted_index_skips_seeding_on_restart() {
    let data = TempDir::new().unwrap();
    std::fs::write(data.path().join("notes.txt"), "Olive oil is rich in oleic acid.").unwrap();
    let persist = TempDir::new().unwrap();

    {
        let store = Arc::new(SqliteVectorStore::open(persist.path()).unwrap());
        let rag = pipeline_with(
            ChunkingConfig::default(),
            store,
            Arc::new(FakeLlm::answering("ok")),
            Arc::new(OverlapScorer::new()),
        );
        assert_eq!(
            rag.initialize(Some(data.path())).await.unwrap(),
            InitReport::Seeded { chunks: 1 }
        );
    }

    let store = Arc::new(SqliteVectorStore::open(persist.path()).unwrap());
    let rag = pipeline_with(
        ChunkingConfig::default(),
        store,
        Arc::new(FakeLlm::answering("ok")),
        Arc::new(OverlapScorer::new()),
    );

    assert_eq!(
        rag.initialize(Some(data.path())).await.unwrap(),
        InitReport::SkippedExistingData { count: 1 }
    );

    let documents = rag.list_documents().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].content, "Olive oil is rich in oleic acid.");
    assert_eq!(documents[0].metadata.get("start_index"), Some(&json!(0)));
}

#[tokio::test]
async fn test_small_chunks_carry_overlap() {
    let data = TempDir::new().unwrap();
    let path = data.path().join("words.txt");
    std::fs::write(&path, "alpha beta gamma delta epsilon zeta eta theta iota kappa").unwrap();

    let chunking = ChunkingConfig {
        chunk_size: 20,
        chunk_overlap: 6,
    };
    let store = Arc::new(SqliteVectorStore::in_memory().unwrap());
    let rag = pipeline_with(
        chunking,
        store,
        Arc::new(FakeLlm::answering("ok")),
        Arc::new(OverlapScorer::new()),
    );
    rag.initialize(None).await.unwrap();

    assert!(rag.add_document_from_file(&path).await.unwrap());

    let documents = rag.list_documents().await.unwrap();
    assert!(documents.len() > 1);
    for doc in &documents {
        assert!(doc.content.chars().count() <= 20);
        assert_eq!(doc.metadata.source(), Some(path.to_string_lossy().as_ref()));
    }
}

#[tokio::test]
async fn test_query_over_fetches_twice_top_k() {
    let data = TempDir::new().unwrap();
    let foods = [
        "oats", "barley", "lentils", "chickpeas", "walnuts", "spinach", "salmon", "quinoa",
    ];
    for food in foods {
        std::fs::write(
            data.path().join(format!("{}.txt", food)),
            format!("{} is a nutritious food", food),
        )
        .unwrap();
    }

    let scorer = Arc::new(OverlapScorer::new());
    let store = Arc::new(SqliteVectorStore::in_memory().unwrap());
    let rag = pipeline_with(
        ChunkingConfig::default(),
        store,
        Arc::new(FakeLlm::answering("ok")),
        scorer.clone(),
    );
    assert_eq!(
        rag.initialize(Some(data.path())).await.unwrap(),
        InitReport::Seeded { chunks: 8 }
    );

    let result = rag.query("which food is nutritious", 3).await.unwrap();

    assert_eq!(scorer.last_batch(), 6);
    assert_eq!(result.sources.len(), 3);
}
