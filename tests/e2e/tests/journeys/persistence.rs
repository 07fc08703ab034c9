//! File-backed persistence journeys: reopen without re-ingesting, vector
//! round-trips, and migration idempotence.

use gognee_core::{node_id, EntityType, Gognee, GogneeConfig, SearchOptions, SearchType};
use gognee_e2e_tests::harness::standard_world;
use gognee_e2e_tests::mocks::MockEmbedder;

fn file_config(path: &std::path::Path) -> GogneeConfig {
    GogneeConfig {
        db_path: path.to_str().unwrap().to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn vectors_survive_reopen_without_reingest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kg.db");

    {
        let gognee = Gognee::builder(standard_world(), MockEmbedder::new())
            .config(file_config(&path))
            .build()
            .unwrap();
        gognee.add("Alice works with Bob at Acme.", None).unwrap();
        gognee.cognify().await.unwrap();
        gognee.close();
    }

    let llm = standard_world();
    let gognee = Gognee::builder(llm.clone(), MockEmbedder::new())
        .config(file_config(&path))
        .build()
        .unwrap();

    let results = gognee
        .search(
            "Alice Acme engineers",
            SearchOptions {
                search_type: SearchType::Vector,
                top_k: 5,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(!results.is_empty(), "persisted vectors should be searchable");
    assert!(
        results.iter().any(|r| r.node.id == node_id("Alice", EntityType::Person)),
        "Alice should come back from the persisted index"
    );
    // Only the query was embedded; no extraction happened on reopen.
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn tracker_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kg.db");

    {
        let gognee = Gognee::builder(standard_world(), MockEmbedder::new())
            .config(file_config(&path))
            .build()
            .unwrap();
        gognee.add("Alice works with Bob at Acme.", None).unwrap();
        gognee.cognify().await.unwrap();
    }

    let llm = standard_world();
    let gognee = Gognee::builder(llm.clone(), MockEmbedder::new())
        .config(file_config(&path))
        .build()
        .unwrap();

    gognee.add("Alice works with Bob at Acme.", None).unwrap();
    let report = gognee.cognify().await.unwrap();
    assert_eq!(report.documents_skipped, 1);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn stats_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kg.db");

    let before = {
        let gognee = Gognee::builder(standard_world(), MockEmbedder::new())
            .config(file_config(&path))
            .build()
            .unwrap();
        gognee.add("Alice works with Bob at Acme.", None).unwrap();
        gognee.cognify().await.unwrap();
        gognee.stats().unwrap()
    };

    let gognee = Gognee::builder(standard_world(), MockEmbedder::new())
        .config(file_config(&path))
        .build()
        .unwrap();
    let after = gognee.stats().unwrap();

    assert_eq!(before.nodes, after.nodes);
    assert_eq!(before.edges, after.edges);
    assert_eq!(before.documents, after.documents);
}

#[tokio::test]
async fn reset_processed_documents_forces_reprocessing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kg.db");
    let gognee = Gognee::builder(standard_world(), MockEmbedder::new())
        .config(file_config(&path))
        .build()
        .unwrap();

    gognee.add("Alice works with Bob at Acme.", None).unwrap();
    gognee.cognify().await.unwrap();
    assert_eq!(gognee.stats().unwrap().documents, 1);

    gognee.reset_processed_documents().unwrap();
    assert_eq!(gognee.stats().unwrap().documents, 0);

    gognee.add("Alice works with Bob at Acme.", None).unwrap();
    let report = gognee.cognify().await.unwrap();
    assert_eq!(report.documents_processed, 1);
}
