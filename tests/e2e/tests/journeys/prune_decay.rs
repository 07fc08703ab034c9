//! Pruning and decay journeys: dry-run purity, pin/permanent protection,
//! superseded-memory pruning, and decay-ranked retrieval.

use chrono::{Duration, Utc};
use gognee_core::{
    node_id, DecayBasis, EntityType, GogneeConfig, MemoryInput, Node, PruneOptions, SearchOptions,
    SearchType,
};
use gognee_e2e_tests::harness::{build, build_default};
use gognee_e2e_tests::mocks::MockEmbedder;

#[tokio::test]
async fn dry_run_reports_without_mutating() {
    let (gognee, _llm, _embedder) = build_default();
    gognee.add("Alice works with Bob at Acme.", None).unwrap();
    gognee.cognify().await.unwrap();

    let before = gognee.stats().unwrap();
    assert!(before.nodes > 0);

    let report = gognee
        .prune(PruneOptions {
            max_age_days: Some(0),
            dry_run: true,
            ..Default::default()
        })
        .unwrap();

    assert!(report.nodes_pruned > 0);
    assert!(report.edges_pruned > 0);
    let after = gognee.stats().unwrap();
    assert_eq!(before.nodes, after.nodes);
    assert_eq!(before.edges, after.edges);
}

#[tokio::test]
async fn pinned_memory_and_its_nodes_survive_prune() {
    let (gognee, _llm, _embedder) = build_default();

    // Legacy graph content that the prune may take.
    gognee.add("Alice works with Bob at Acme.", None).unwrap();
    gognee.cognify().await.unwrap();

    let memory = gognee
        .add_memory(MemoryInput {
            topic: "decision-x".to_string(),
            context: "pick Go over Rust".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    gognee.pin_memory(&memory.id, "legal hold").unwrap();

    let report = gognee
        .prune(PruneOptions {
            max_age_days: Some(0),
            dry_run: false,
            ..Default::default()
        })
        .unwrap();
    assert!(report.nodes_pruned > 0);

    // The pinned memory and every node uniquely provenanced by it survive.
    assert!(gognee.memories().find_memory(&memory.id).unwrap().is_some());
    let go_id = node_id("Go", EntityType::Technology);
    let rust_id = node_id("Rust", EntityType::Technology);
    assert!(gognee.graph().get_node(&go_id).unwrap().is_some());
    assert!(gognee.graph().get_node(&rust_id).unwrap().is_some());

    // Legacy nodes had no protection.
    let alice_id = node_id("Alice", EntityType::Person);
    assert!(gognee.graph().get_node(&alice_id).unwrap().is_none());
}

#[tokio::test]
async fn superseded_memories_prune_after_grace() {
    let (gognee, _llm, _embedder) = build_default();

    let older = gognee
        .add_memory(MemoryInput {
            topic: "decision-x".to_string(),
            context: "pick Go over Rust".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    gognee
        .add_memory(MemoryInput {
            topic: "decision-x-revised".to_string(),
            context: "stay with Go".to_string(),
            supersedes: vec![older.id.clone()],
            ..Default::default()
        })
        .await
        .unwrap();

    // Flag off: superseded memories are not evaluated at all.
    let untouched = gognee
        .prune(PruneOptions {
            prune_superseded: Some(false),
            superseded_age_days: Some(0),
            dry_run: false,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(untouched.superseded_memories_pruned, 0);
    assert!(gognee.memories().find_memory(&older.id).unwrap().is_some());

    let report = gognee
        .prune(PruneOptions {
            prune_superseded: Some(true),
            superseded_age_days: Some(0),
            dry_run: false,
            ..Default::default()
        })
        .unwrap();

    assert_eq!(report.superseded_memories_pruned, 1);
    assert!(report.memories_evaluated >= 1);
    assert!(gognee.memories().find_memory(&older.id).unwrap().is_none());
}

#[tokio::test]
async fn older_nodes_rank_below_newer_at_equal_relevance() {
    let mut config = GogneeConfig::default();
    config.decay_enabled = true;
    config.decay_basis = DecayBasis::Creation;
    config.decay_half_life_days = 30.0;
    let (gognee, _llm, _embedder) = build(config);

    // Two nodes with identical embeddings; only created_at differs.
    let now = Utc::now();
    let mut old_node = Node::new("Old finding", EntityType::Concept);
    old_node.created_at = now - Duration::days(90);
    let mut new_node = Node::new("New finding", EntityType::Concept);
    new_node.created_at = now - Duration::days(1);
    gognee.graph().upsert_node(&old_node).unwrap();
    gognee.graph().upsert_node(&new_node).unwrap();

    let vector = MockEmbedder::vector_for("zebra migration pattern");
    gognee.vectors().add(&old_node.id, &vector).unwrap();
    gognee.vectors().add(&new_node.id, &vector).unwrap();

    let results = gognee
        .search(
            "zebra migration pattern",
            SearchOptions {
                search_type: SearchType::Vector,
                top_k: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].node.id, new_node.id);
    let old_score = results
        .iter()
        .find(|r| r.node.id == old_node.id)
        .unwrap()
        .score;
    assert!(old_score < results[0].score);
}

#[tokio::test]
async fn decay_disabled_leaves_scores_untouched() {
    let (gognee, _llm, _embedder) = build_default();

    let now = Utc::now();
    let mut old_node = Node::new("Old finding", EntityType::Concept);
    old_node.created_at = now - Duration::days(90);
    gognee.graph().upsert_node(&old_node).unwrap();
    let vector = MockEmbedder::vector_for("zebra migration pattern");
    gognee.vectors().add(&old_node.id, &vector).unwrap();

    let results = gognee
        .search(
            "zebra migration pattern",
            SearchOptions {
                search_type: SearchType::Vector,
                top_k: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Identical embedding, no decay: cosine similarity stays 1.0.
    assert!((results[0].score - 1.0).abs() < 1e-5);
}
