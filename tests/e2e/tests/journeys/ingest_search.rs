//! Ingestion and retrieval journeys: the add → cognify → search loop,
//! incremental skip, force override, and partial-failure accounting.

use gognee_core::{
    node_id, EntityType, GogneeConfig, GogneeError, SearchOptions, SearchType,
};
use gognee_e2e_tests::harness::{build, build_default};
use gognee_e2e_tests::mocks::{MockEmbedder, MockLlm};

const DOC: &str = "Alice works with Bob at Acme.";

#[tokio::test]
async fn basic_cognify_builds_typed_graph() {
    let (gognee, _llm, _embedder) = build_default();

    gognee.add(DOC, Some("notes.txt")).unwrap();
    let report = gognee.cognify().await.unwrap();

    assert_eq!(report.documents_processed, 1);
    assert_eq!(report.documents_skipped, 0);
    assert_eq!(report.edges_skipped, 0);
    assert!(report.errors.is_empty());

    // Exact names, typed IDs.
    let alice = gognee
        .graph()
        .get_node(&node_id("Alice", EntityType::Person))
        .unwrap()
        .expect("Alice node");
    assert_eq!(alice.name, "Alice");
    gognee
        .graph()
        .get_node(&node_id("Bob", EntityType::Person))
        .unwrap()
        .expect("Bob node");
    gognee
        .graph()
        .get_node(&node_id("Acme", EntityType::Organization))
        .unwrap()
        .expect("Acme node");

    let edges = gognee.graph().get_edges(&alice.id).unwrap();
    assert!(edges
        .iter()
        .any(|e| e.relation.to_lowercase().contains("works")));
}

#[tokio::test]
async fn edge_endpoints_are_typed_node_ids() {
    let (gognee, _llm, _embedder) = build_default();
    gognee.add(DOC, None).unwrap();
    gognee.cognify().await.unwrap();

    let alice_id = node_id("Alice", EntityType::Person);
    let acme_id = node_id("Acme", EntityType::Organization);
    let edges = gognee.graph().get_edges(&alice_id).unwrap();
    let works_at = edges
        .iter()
        .find(|e| e.relation == "works at")
        .expect("works at edge");
    assert_eq!(works_at.source_id, alice_id);
    assert_eq!(works_at.target_id, acme_id);
}

#[tokio::test]
async fn second_run_skips_and_makes_no_client_calls() {
    let (gognee, llm, embedder) = build_default();

    gognee.add(DOC, None).unwrap();
    let first = gognee.cognify().await.unwrap();
    assert_eq!(first.documents_processed, 1);

    let llm_calls = llm.calls();
    let embed_calls = embedder.calls();
    let nodes_before = gognee.stats().unwrap().nodes;

    gognee.add(DOC, None).unwrap();
    let second = gognee.cognify().await.unwrap();

    assert_eq!(second.documents_skipped, 1);
    assert_eq!(second.documents_processed, 0);
    assert_eq!(llm.calls(), llm_calls, "no LLM calls for a skipped document");
    assert_eq!(embedder.calls(), embed_calls, "no embedding calls for a skipped document");
    assert_eq!(gognee.stats().unwrap().nodes, nodes_before);
}

#[tokio::test]
async fn reingest_is_idempotent_on_counts() {
    let mut config = GogneeConfig::default();
    config.force = true;
    let (gognee, _llm, _embedder) = build(config);

    gognee.add(DOC, None).unwrap();
    gognee.cognify().await.unwrap();
    let stats_first = gognee.stats().unwrap();

    gognee.add(DOC, None).unwrap();
    gognee.cognify().await.unwrap();
    let stats_second = gognee.stats().unwrap();

    assert_eq!(stats_first.nodes, stats_second.nodes);
    assert_eq!(stats_first.edges, stats_second.edges);
}

#[tokio::test]
async fn force_reprocesses_regardless_of_tracker() {
    let mut config = GogneeConfig::default();
    config.force = true;
    let (gognee, llm, _embedder) = build(config);

    gognee.add(DOC, None).unwrap();
    gognee.cognify().await.unwrap();
    let calls_after_first = llm.calls();

    gognee.add(DOC, None).unwrap();
    let second = gognee.cognify().await.unwrap();
    assert_eq!(second.documents_processed, 1);
    assert_eq!(second.documents_skipped, 0);
    assert!(llm.calls() > calls_after_first);
}

#[tokio::test]
async fn whitespace_change_is_a_new_document() {
    let (gognee, _llm, _embedder) = build_default();
    gognee.add(DOC, None).unwrap();
    gognee.cognify().await.unwrap();

    gognee.add("Alice works with Bob at  Acme.", None).unwrap();
    let report = gognee.cognify().await.unwrap();
    assert_eq!(report.documents_processed, 1);
    assert_eq!(report.documents_skipped, 0);
}

#[tokio::test]
async fn ambiguous_entity_name_skips_edge() {
    let llm = MockLlm::new(
        &[
            ("Mercury", "Person", "A courier"),
            ("Mercury", "Concept", "A planet"),
            ("Sun", "Concept", "The star"),
        ],
        &[("Mercury", "orbits", "Sun")],
    );
    let gognee = gognee_core::Gognee::builder(llm, MockEmbedder::new())
        .build()
        .unwrap();

    gognee.add("Mercury orbits Sun.", None).unwrap();
    let report = gognee.cognify().await.unwrap();

    assert_eq!(report.edges_skipped, 1);
    assert_eq!(gognee.stats().unwrap().edges, 0);
}

#[tokio::test]
async fn llm_failure_is_recorded_and_run_continues() {
    let (gognee, llm, _embedder) = build_default();

    llm.fail_next(2); // both extraction stages of the single chunk
    gognee.add(DOC, None).unwrap();
    let report = gognee.cognify().await.unwrap();

    assert_eq!(report.chunks_failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.documents_processed, 1);
}

#[tokio::test]
async fn embedding_failure_still_upserts_nodes() {
    let (gognee, _llm, embedder) = build_default();

    embedder.fail_next(1);
    gognee.add(DOC, None).unwrap();
    let report = gognee.cognify().await.unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(report.nodes_created >= 3, "nodes land without embeddings");
    let alice = gognee
        .graph()
        .get_node(&node_id("Alice", EntityType::Person))
        .unwrap()
        .unwrap();
    assert!(alice.embedding.is_none());
}

#[tokio::test]
async fn empty_document_is_rejected() {
    let (gognee, _llm, _embedder) = build_default();
    assert!(matches!(
        gognee.add("   ", None),
        Err(GogneeError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn search_reinforces_access_once_per_result() {
    let (gognee, _llm, _embedder) = build_default();
    gognee.add(DOC, None).unwrap();
    gognee.cognify().await.unwrap();

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
    assert!(!results.is_empty());

    for result in &results {
        let node = gognee.graph().get_node(&result.node.id).unwrap().unwrap();
        assert_eq!(node.access_count, 1);
        assert!(node.last_accessed_at.is_some());
    }
}

#[tokio::test]
async fn reinforcement_can_be_disabled() {
    let (gognee, _llm, _embedder) = build_default();
    gognee.add(DOC, None).unwrap();
    gognee.cognify().await.unwrap();

    let results = gognee
        .search(
            "Alice Acme engineers",
            SearchOptions {
                search_type: SearchType::Vector,
                reinforce_access: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!results.is_empty());
    for result in &results {
        let node = gognee.graph().get_node(&result.node.id).unwrap().unwrap();
        assert_eq!(node.access_count, 0);
    }
}

#[tokio::test]
async fn graph_search_requires_seeds() {
    let (gognee, _llm, _embedder) = build_default();
    let err = gognee
        .search(
            "",
            SearchOptions {
                search_type: SearchType::Graph,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GogneeError::InvalidInput(_)));
}

#[tokio::test]
async fn hybrid_search_reaches_neighbors() {
    let (gognee, _llm, _embedder) = build_default();
    gognee.add(DOC, None).unwrap();
    gognee.add("Carol works at Acme.", None).unwrap();
    gognee.cognify().await.unwrap();

    // Carol shares no tokens with the query but is two hops from Alice
    // through Acme.
    let results = gognee
        .search(
            "Alice engineers",
            SearchOptions {
                search_type: SearchType::Hybrid,
                top_k: 10,
                graph_depth: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let carol_id = node_id("Carol", EntityType::Person);
    assert!(results.iter().any(|r| r.node.id == carol_id));
}
