//! Memory lifecycle journeys: provenance, dedup, supersession chains,
//! update diffing, and reference-counted garbage collection.

use gognee_core::{
    node_id, EntityType, GogneeError, ListMemoryOptions, MemoryInput, MemoryStatus, MemoryUpdate,
    SearchOptions,
};
use gognee_e2e_tests::harness::build_default;

fn decision_memory() -> MemoryInput {
    MemoryInput {
        topic: "decision-x".to_string(),
        context: "pick Go over Rust".to_string(),
        decisions: vec!["use Go".to_string()],
        ..Default::default()
    }
}

#[tokio::test]
async fn added_memory_is_searchable_with_provenance() {
    let (gognee, _llm, _embedder) = build_default();

    let memory = gognee.add_memory(decision_memory()).await.unwrap();
    assert_eq!(memory.status, MemoryStatus::Active);

    let results = gognee
        .search(
            "language choice",
            SearchOptions {
                top_k: 3,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(
        results.iter().any(|r| r.memory_ids.contains(&memory.id)),
        "at least one result should carry the new memory's ID"
    );
}

#[tokio::test]
async fn identical_payload_dedups_by_doc_hash() {
    let (gognee, _llm, _embedder) = build_default();

    let first = gognee.add_memory(decision_memory()).await.unwrap();
    let mut with_metadata = decision_memory();
    with_metadata
        .metadata
        .insert("author".to_string(), serde_json::json!("alice"));
    let second = gognee.add_memory(with_metadata).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(gognee.stats().unwrap().memories, 1);
}

#[tokio::test]
async fn supersession_updates_status_and_chain() {
    let (gognee, _llm, _embedder) = build_default();

    let older = gognee.add_memory(decision_memory()).await.unwrap();
    let newer = gognee
        .add_memory(MemoryInput {
            topic: "decision-x-revised".to_string(),
            context: "stay with Go, revisit Rust next year".to_string(),
            supersedes: vec![older.id.clone()],
            supersedes_reason: Some("updated plan".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let older = gognee.memories().find_memory(&older.id).unwrap().unwrap();
    assert_eq!(older.status, MemoryStatus::Superseded);
    assert_eq!(older.superseded_by.as_deref(), Some(newer.id.as_str()));

    let chain = gognee.get_supersession_chain(&older.id).unwrap();
    let ids: Vec<&str> = chain.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec![older.id.as_str(), newer.id.as_str()]);
}

#[tokio::test]
async fn supersession_target_must_exist_and_be_supersedable() {
    let (gognee, _llm, _embedder) = build_default();

    let missing = gognee
        .add_memory(MemoryInput {
            topic: "bad".to_string(),
            context: "ctx".to_string(),
            supersedes: vec!["no-such-memory".to_string()],
            ..Default::default()
        })
        .await;
    assert!(matches!(missing, Err(GogneeError::Conflict(_))));

    let pinned = gognee.add_memory(decision_memory()).await.unwrap();
    gognee.pin_memory(&pinned.id, "hold").unwrap();
    let conflict = gognee
        .add_memory(MemoryInput {
            topic: "replacement".to_string(),
            context: "ctx".to_string(),
            supersedes: vec![pinned.id.clone()],
            ..Default::default()
        })
        .await;
    assert!(matches!(conflict, Err(GogneeError::Conflict(_))));
}

#[tokio::test]
async fn delete_respects_shared_and_legacy_artifacts() {
    let (gognee, _llm, _embedder) = build_default();

    // Legacy node from plain document ingestion, never provenance-tracked.
    gognee.add("Alice works with Bob at Acme.", None).unwrap();
    gognee.cognify().await.unwrap();

    // Memory A references Go and Rust; memory B references only Rust.
    let a = gognee.add_memory(decision_memory()).await.unwrap();
    let b = gognee
        .add_memory(MemoryInput {
            topic: "rust-adoption".to_string(),
            context: "Rust is promising for the parser".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let go_id = node_id("Go", EntityType::Technology);
    let rust_id = node_id("Rust", EntityType::Technology);
    let alice_id = node_id("Alice", EntityType::Person);
    assert!(gognee.graph().get_node(&go_id).unwrap().is_some());

    gognee.delete_memory(&a.id).unwrap();

    // Go was only provenanced by A: collected. Rust stays via B. Alice is
    // legacy and untouched.
    assert!(gognee.graph().get_node(&go_id).unwrap().is_none());
    assert!(gognee.graph().get_node(&rust_id).unwrap().is_some());
    assert!(gognee.graph().get_node(&alice_id).unwrap().is_some());
    assert!(gognee.memories().find_memory(&a.id).unwrap().is_none());
    assert!(gognee.memories().find_memory(&b.id).unwrap().is_some());
}

#[tokio::test]
async fn update_memory_diffs_provenance_and_collects_orphans() {
    let (gognee, _llm, _embedder) = build_default();

    let memory = gognee.add_memory(decision_memory()).await.unwrap();
    let go_id = node_id("Go", EntityType::Technology);
    assert!(gognee.graph().get_node(&go_id).unwrap().is_some());

    let updated = gognee
        .update_memory(
            &memory.id,
            MemoryUpdate {
                context: Some("Alice will evaluate the proposal".to_string()),
                decisions: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.context, "Alice will evaluate the proposal");
    assert_ne!(updated.doc_hash, memory.doc_hash);

    // Old artifacts referenced only by this memory are collected; the new
    // canonical text provenances Alice instead.
    assert!(gognee.graph().get_node(&go_id).unwrap().is_none());
    let alice_id = node_id("Alice", EntityType::Person);
    let provenance = gognee
        .memories()
        .memory_ids_for_nodes(&[alice_id])
        .unwrap();
    assert_eq!(provenance.len(), 1);
}

#[tokio::test]
async fn get_memory_records_access() {
    let (gognee, _llm, _embedder) = build_default();
    let memory = gognee.add_memory(decision_memory()).await.unwrap();

    let first = gognee.get_memory(&memory.id).unwrap();
    assert_eq!(first.access_count, 1);
    let second = gognee.get_memory(&memory.id).unwrap();
    assert_eq!(second.access_count, 2);
    assert!(second.last_accessed_at.is_some());

    assert!(matches!(
        gognee.get_memory("missing"),
        Err(GogneeError::NotFound(_))
    ));
}

#[tokio::test]
async fn pin_and_unpin_round_trip() {
    let (gognee, _llm, _embedder) = build_default();
    let memory = gognee.add_memory(decision_memory()).await.unwrap();

    let pinned = gognee.pin_memory(&memory.id, "legal hold").unwrap();
    assert!(pinned.pinned);
    assert_eq!(pinned.status, MemoryStatus::Pinned);
    assert_eq!(pinned.pinned_reason.as_deref(), Some("legal hold"));
    assert!(pinned.pinned_at.is_some());

    let unpinned = gognee.unpin_memory(&memory.id).unwrap();
    assert!(!unpinned.pinned);
    assert_eq!(unpinned.status, MemoryStatus::Active);
    assert!(unpinned.pinned_reason.is_none());
}

#[tokio::test]
async fn list_memories_filters_and_pages() {
    let (gognee, _llm, _embedder) = build_default();
    let a = gognee.add_memory(decision_memory()).await.unwrap();
    let b = gognee
        .add_memory(MemoryInput {
            topic: "second".to_string(),
            context: "another memory".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    gognee.pin_memory(&b.id, "hold").unwrap();

    let pinned_only = gognee
        .list_memories(ListMemoryOptions {
            pinned: Some(true),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(pinned_only.len(), 1);
    assert_eq!(pinned_only[0].id, b.id);

    let paged = gognee
        .list_memories(ListMemoryOptions {
            limit: Some(1),
            offset: Some(0),
            desc: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(paged.len(), 1);

    let active = gognee
        .list_memories(ListMemoryOptions {
            status: Some(MemoryStatus::Active),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, a.id);
}
