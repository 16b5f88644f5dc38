//! Vector store build, search and persistence tests.

mod common;

use std::sync::Arc;

use common::{CharHistogramEmbedder, FailingEmbedder, LyingEmbedder, TableEmbedder, chunk};
use mailassist_rag::vectorstore::{chunks_path, index_path};
use mailassist_rag::{RagError, VectorStore};
use proptest::prelude::*;

fn policy_chunks() -> Vec<mailassist_rag::Chunk> {
    vec![
        chunk("leave.docx", 0, "Employees receive ten paid sick days per year."),
        chunk("leave.docx", 1, "Annual vacation is twenty five days."),
        chunk("expenses.docx", 0, "Travel expenses are reimbursed within thirty days."),
        chunk("security.docx", 0, "Badges must be worn at all times inside the office."),
    ]
}

#[tokio::test]
async fn unbuilt_store_returns_nothing_without_embedding() {
    let embedder = Arc::new(CharHistogramEmbedder::new(16));
    let store = VectorStore::new(embedder.clone());

    assert!(store.similarity_search("sick leave", 3).await.unwrap().is_empty());
    assert!(store.is_empty().await);
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn zero_k_returns_nothing() {
    let embedder = Arc::new(CharHistogramEmbedder::new(16));
    let store = VectorStore::new(embedder.clone());
    store.build(policy_chunks()).await.unwrap();
    let calls_after_build = embedder.calls();

    assert!(store.similarity_search("sick leave", 0).await.unwrap().is_empty());
    assert_eq!(embedder.calls(), calls_after_build);
}

#[tokio::test]
async fn nearest_chunk_ranks_first() {
    let embedder = Arc::new(TableEmbedder::new(
        2,
        &[
            ("a", vec![0.0, 0.0]),
            ("b", vec![1.0, 0.0]),
            ("c", vec![0.0, 3.0]),
            ("query", vec![0.9, 0.0]),
        ],
    ));
    let store = VectorStore::new(embedder);
    store
        .build(vec![chunk("x.docx", 0, "a"), chunk("x.docx", 1, "b"), chunk("x.docx", 2, "c")])
        .await
        .unwrap();

    let results = store.similarity_search("query", 3).await.unwrap();
    let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
    assert_eq!(texts, vec!["b", "a", "c"]);

    // squared distance 0.01 for the nearest hit
    assert!((results[0].score - 1.0 / 1.01).abs() < 1e-5);
}

#[tokio::test]
async fn k_beyond_corpus_returns_every_chunk() {
    let store = VectorStore::new(Arc::new(CharHistogramEmbedder::new(16)));
    store.build(policy_chunks()).await.unwrap();
    assert_eq!(store.similarity_search("days", 50).await.unwrap().len(), 4);
}

#[tokio::test]
async fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("faiss_index");

    let store = VectorStore::new(Arc::new(CharHistogramEmbedder::new(16)));
    store.build(policy_chunks()).await.unwrap();
    store.save(&path).await.unwrap();
    assert!(index_path(&path).exists());
    assert!(chunks_path(&path).exists());

    let restored = VectorStore::new(Arc::new(CharHistogramEmbedder::new(16)));
    assert!(restored.load(&path).await.unwrap());
    assert_eq!(restored.len().await, 4);

    let before = store.similarity_search("sick days", 2).await.unwrap();
    let after = restored.similarity_search("sick days", 2).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn load_reports_missing_files_as_false() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("faiss_index");
    let store = VectorStore::new(Arc::new(CharHistogramEmbedder::new(16)));

    assert!(!store.load(&path).await.unwrap());

    // one of the two files is not enough
    std::fs::write(chunks_path(&path), "[]").unwrap();
    assert!(!store.load(&path).await.unwrap());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn load_rejects_corrupt_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("faiss_index");
    std::fs::write(index_path(&path), b"bad").unwrap();
    std::fs::write(chunks_path(&path), "[]").unwrap();

    let store = VectorStore::new(Arc::new(CharHistogramEmbedder::new(16)));
    let err = store.load(&path).await.unwrap_err();
    assert!(matches!(err, RagError::CorruptIndex { .. }), "unexpected error: {err}");
}

#[tokio::test]
async fn load_rejects_misaligned_chunk_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("faiss_index");
    let store = VectorStore::new(Arc::new(CharHistogramEmbedder::new(16)));
    store.build(policy_chunks()).await.unwrap();
    store.save(&path).await.unwrap();

    std::fs::write(chunks_path(&path), "[]").unwrap();
    let err = store.load(&path).await.unwrap_err();
    assert!(matches!(err, RagError::CorruptIndex { .. }));

    // the previously built index is still served
    assert_eq!(store.len().await, 4);
}

#[tokio::test]
async fn load_rejects_other_dimensionality() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("faiss_index");
    let store = VectorStore::new(Arc::new(CharHistogramEmbedder::new(16)));
    store.build(policy_chunks()).await.unwrap();
    store.save(&path).await.unwrap();

    let other = VectorStore::new(Arc::new(CharHistogramEmbedder::new(8)));
    assert!(matches!(other.load(&path).await, Err(RagError::CorruptIndex { .. })));
}

#[tokio::test]
async fn save_without_index_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::new(Arc::new(CharHistogramEmbedder::new(16)));
    let err = store.save(&dir.path().join("faiss_index")).await.unwrap_err();
    assert!(matches!(err, RagError::IndexNotBuilt));
    assert_eq!(err.to_string(), "No index to save");
}

#[tokio::test]
async fn build_rejects_wrong_dimensionality_and_keeps_previous_index() {
    let store = VectorStore::new(Arc::new(LyingEmbedder));
    let err = store.build(policy_chunks()).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 4, actual: 3 }));
    assert!(store.snapshot().await.is_none());
}

#[tokio::test]
async fn embedding_failures_surface_as_errors() {
    let store = VectorStore::new(Arc::new(FailingEmbedder));
    assert!(matches!(store.build(policy_chunks()).await, Err(RagError::Embedding { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn searches_see_whole_snapshots_during_rebuilds() {
    let store = Arc::new(VectorStore::new(Arc::new(CharHistogramEmbedder::new(16))));
    store.build(policy_chunks()[..2].to_vec()).await.unwrap();

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for round in 0..50 {
                let chunks = if round % 2 == 0 { policy_chunks() } else { policy_chunks()[..2].to_vec() };
                store.build(chunks).await.unwrap();
            }
        })
    };

    for _ in 0..200 {
        let n = store.similarity_search("paid leave", 10).await.unwrap().len();
        assert!(n == 2 || n == 4, "observed partial index of {n} chunks");
    }
    writer.await.unwrap();
}

/// For any corpus of N chunks and k <= N, search returns exactly k results
/// with non-increasing scores in (0, 1].
mod prop_search_ordering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn exactly_k_results_sorted_by_score(
            texts in proptest::collection::vec("[a-z ]{1,40}", 1..20),
            query in "[a-z ]{1,30}",
            k_seed in 0usize..100,
        ) {
            let k = 1 + k_seed % texts.len();
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = VectorStore::new(Arc::new(CharHistogramEmbedder::new(16)));
                let chunks = texts.iter().enumerate().map(|(i, t)| chunk("p.docx", i, t)).collect();
                store.build(chunks).await.unwrap();
                store.similarity_search(&query, k).await.unwrap()
            });

            prop_assert_eq!(results.len(), k);
            for r in &results {
                prop_assert!(r.score > 0.0 && r.score <= 1.0);
            }
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
