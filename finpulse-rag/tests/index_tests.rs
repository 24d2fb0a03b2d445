//! Integration tests for indexing, retrieval, and persistence.

use std::collections::BTreeMap;
use std::sync::Arc;

use finpulse_rag::{
    ChunkStore, HashingEmbedder, IndexConfig, JsonFileChunkStore, RelevanceIndex, ScoringKind,
    SourceDocument, chunk_text,
};

const Q3_MDA: &str = "Total net sales increased 6 percent compared to the prior year quarter. \
    Services revenue reached a new record. Gross margin expanded on a favorable mix. \
    The company returned cash to shareholders through dividends and repurchases.";

const RISK_FACTORS: &str = "The company faces risk from foreign exchange volatility. \
    Supply chain disruptions could reduce product availability. \
    Changes in tax law create uncertainty for future periods.";

fn small_config() -> IndexConfig {
    IndexConfig::builder().chunk_size(80).chunk_overlap(20).top_k(5).build().unwrap()
}

fn documents() -> Vec<SourceDocument> {
    vec![
        SourceDocument::new(Q3_MDA, "https://www.sec.gov/Archives/edgar/data/320193/1/q3.htm"),
        SourceDocument::new(RISK_FACTORS, "https://www.sec.gov/Archives/edgar/data/320193/2/q2.htm"),
    ]
}

async fn lexical_index() -> RelevanceIndex {
    RelevanceIndex::builder().config(small_config()).build().await.unwrap()
}

#[tokio::test]
async fn total_chunks_equals_sum_of_per_document_chunks() {
    let index = lexical_index().await;
    let docs = documents();
    let expected: usize = docs.iter().map(|d| chunk_text(&d.text, 80, 20).len()).sum();

    let committed = index.index(&docs, None).await.unwrap();
    let stats = index.stats().await;

    assert_eq!(committed, expected);
    assert_eq!(stats.total_chunks, expected);
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.strategy, ScoringKind::Lexical);
    assert!(!stats.persisted);
}

#[tokio::test]
async fn clear_empties_the_index() {
    let index = lexical_index().await;
    index.index(&documents(), None).await.unwrap();

    index.clear().await.unwrap();

    assert_eq!(index.stats().await.total_chunks, 0);
    assert!(index.retrieve("revenue", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_document_list_is_a_no_op() {
    let index = lexical_index().await;
    assert_eq!(index.index(&[], None).await.unwrap(), 0);
    assert_eq!(index.stats().await.total_chunks, 0);
}

#[tokio::test]
async fn empty_index_returns_nothing_for_any_k() {
    let index = lexical_index().await;
    for k in [0, 1, 5, 1000] {
        assert!(index.retrieve("latest quarterly performance", k).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn retrieval_is_bounded_by_k_and_scores_are_normalized() {
    let index = lexical_index().await;
    index.index(&documents(), None).await.unwrap();

    let one = index.retrieve("revenue risk cash", 1).await.unwrap();
    assert_eq!(one.len(), 1);

    let all = index.retrieve("revenue risk cash", 1000).await.unwrap();
    assert!(all.len() <= index.stats().await.total_chunks);
    for window in all.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
    assert!(all.iter().all(|r| r.score > 0.0 && r.score <= 1.0));
}

#[tokio::test]
async fn chunk_with_more_expanded_tokens_ranks_higher() {
    let index = lexical_index().await;
    let docs = vec![
        SourceDocument::new("We may sell the unit.", "https://example.com/subset"),
        SourceDocument::new("We may sell and divest the unit.", "https://example.com/superset"),
    ];
    index.index(&docs, None).await.unwrap();

    let results = index.retrieve("sell", 2).await.unwrap();
    assert_eq!(results[0].source_url, "https://example.com/superset");
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn ties_keep_insertion_order() {
    let index = lexical_index().await;
    let docs = vec![
        SourceDocument::new("Debt matured.", "https://example.com/first"),
        SourceDocument::new("Debt matured.", "https://example.com/second"),
    ];
    index.index(&docs, None).await.unwrap();

    let results = index.retrieve("debt", 2).await.unwrap();
    assert_eq!(results[0].source_url, "https://example.com/first");
    assert_eq!(results[1].source_url, "https://example.com/second");
}

#[tokio::test]
async fn caller_metadata_overrides_derived_fields() {
    let index = lexical_index().await;
    let docs = vec![SourceDocument::new("Revenue grew.", "https://example.com/raw")];
    let metadata = vec![BTreeMap::from([
        ("source_url".to_string(), "https://example.com/override".to_string()),
        ("form".to_string(), "10-Q".to_string()),
    ])];

    index.index(&docs, Some(metadata.as_slice())).await.unwrap();

    let results = index.retrieve("revenue", 1).await.unwrap();
    assert_eq!(results[0].source_url, "https://example.com/override");
}

#[tokio::test]
async fn metadata_values_are_distinct_per_field() {
    let index = lexical_index().await;
    let metadata: Vec<_> = ["0000320193-24-000123", "0000320193-24-000081"]
        .iter()
        .map(|accession| BTreeMap::from([("accession_number".to_string(), accession.to_string())]))
        .collect();

    index.index(&documents(), Some(metadata.as_slice())).await.unwrap();

    let accessions = index.metadata_values("accession_number").await;
    assert_eq!(accessions.len(), 2);
    assert!(accessions.contains("0000320193-24-000123"));
    assert!(index.metadata_values("form").await.is_empty());
}

#[tokio::test]
async fn mismatched_metadata_commits_nothing() {
    let index = lexical_index().await;
    let metadata: Vec<BTreeMap<String, String>> = vec![BTreeMap::new()];
    let result = index.index(&documents(), Some(metadata.as_slice())).await;
    assert!(result.is_err());
    assert_eq!(index.stats().await.total_chunks, 0);
}

#[tokio::test]
async fn chunk_ids_stay_unique_across_index_calls() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileChunkStore::new(dir.path().join("idx.json")));
    let index = RelevanceIndex::builder()
        .config(small_config())
        .store(store.clone())
        .build()
        .await
        .unwrap();

    index.index(&documents()[..1], None).await.unwrap();
    index.index(&documents()[1..], None).await.unwrap();

    let snapshot = store.load().await.unwrap();
    let mut ids: Vec<&str> = snapshot.chunks.iter().map(|c| c.chunk.chunk_id.as_str()).collect();
    let before = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), before);
    assert!(snapshot.chunks.iter().any(|c| c.chunk.document_index == 1));
}

#[tokio::test]
async fn persisted_chunks_reload_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index").join("AAPL_10-Q.json");

    let committed = {
        let index = RelevanceIndex::builder()
            .config(small_config())
            .store(Arc::new(JsonFileChunkStore::new(&path)))
            .build()
            .await
            .unwrap();
        index.index(&documents(), None).await.unwrap()
    };

    let reopened = RelevanceIndex::builder()
        .config(small_config())
        .store(Arc::new(JsonFileChunkStore::new(&path)))
        .build()
        .await
        .unwrap();

    let stats = reopened.stats().await;
    assert_eq!(stats.total_chunks, committed);
    assert!(stats.persisted);
    assert!(!reopened.retrieve("revenue", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_snapshot_loads_empty_and_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("idx.json");
    std::fs::write(&path, b"{\"version\": 1, \"chunks\": [trunc").unwrap();

    let index = RelevanceIndex::builder()
        .config(small_config())
        .store(Arc::new(JsonFileChunkStore::new(&path)))
        .build()
        .await
        .unwrap();
    assert_eq!(index.stats().await.total_chunks, 0);

    index.index(&documents(), None).await.unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
}

#[tokio::test]
async fn clear_removes_persisted_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("idx.json");
    let index = RelevanceIndex::builder()
        .store(Arc::new(JsonFileChunkStore::new(&path)))
        .build()
        .await
        .unwrap();
    index.index(&documents(), None).await.unwrap();
    assert!(path.exists());

    index.clear().await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn embedding_strategy_ranks_and_bounds_results() {
    let index = RelevanceIndex::builder()
        .config(small_config())
        .embedding_provider(Arc::new(HashingEmbedder::new(128)))
        .build()
        .await
        .unwrap();
    index.index(&documents(), None).await.unwrap();

    let results = index.retrieve("foreign exchange volatility", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].source_url.ends_with("q2.htm"));
    assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    assert_eq!(index.stats().await.strategy, ScoringKind::Embedding);
}
