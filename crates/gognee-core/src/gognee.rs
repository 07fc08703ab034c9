//! Gognee Facade
//!
//! The single entry point tying the pipeline together: buffered ingestion
//! (`add` + `cognify`), first-class memory lifecycle (`add_memory`,
//! `update_memory`, `delete_memory`, pinning, supersession), pruning, and
//! composed retrieval (`search`).
//!
//! Ingestion follows a two-phase discipline: LLM and embedding calls happen
//! with no database lock held; writes happen in short synchronous sections
//! between suspension points. Partial failures are recorded in
//! [`CognifyResult::errors`] and never abort the run.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{Duration, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::chunk::Chunker;
use crate::clients::{EmbeddingClient, EmbeddingError, LlmClient};
use crate::config::GogneeConfig;
use crate::extract::{ExtractError, ExtractedEntity, Extractor};
use crate::graph::{sha256_hex, Edge, Node};
use crate::memory::{
    ListMemoryOptions, MemoryInput, MemoryRecord, MemoryStatus, MemoryUpdate, RetentionPolicy,
    canonical_doc_hash,
};
use crate::observe::{MetricsCollector, TraceExporter};
use crate::search::{
    DecayConfig, DecayingSearcher, GraphSearcher, HybridSearcher, SearchError, SearchOptions,
    SearchQuery, SearchResult, SearchType, Searcher, VectorSearcher,
};
use crate::storage::{
    Db, DocumentTracker, GraphStore, MemoryStore, StorageError, VectorStore,
};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Facade error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum GogneeError {
    /// Caller input was unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A lookup matched more than one candidate.
    #[error("ambiguous: {0}")]
    Ambiguous(String),
    /// Lifecycle conflict (bad supersession target, wrong status).
    #[error("conflict: {0}")]
    Conflict(String),
    /// Store failure.
    #[error("storage error: {0}")]
    Storage(StorageError),
    /// Embedding endpoint failure on a path that cannot proceed without it.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Extraction failure surfaced outside the best-effort pipeline.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl From<StorageError> for GogneeError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => GogneeError::NotFound(what),
            StorageError::Ambiguous(what) => GogneeError::Ambiguous(what),
            other => GogneeError::Storage(other),
        }
    }
}

impl From<SearchError> for GogneeError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidInput(what) => GogneeError::InvalidInput(what),
            SearchError::Storage(inner) => inner.into(),
        }
    }
}

/// Facade result type
pub type Result<T> = std::result::Result<T, GogneeError>;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Report of one `cognify` run. Best effort: `errors` is authoritative for
/// what went wrong; counters cover what went through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognifyResult {
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub chunks_processed: usize,
    pub chunks_failed: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub edges_skipped: usize,
    pub errors: Vec<String>,
}

/// Options for [`Gognee::prune`]. `None` fields fall back to configuration.
#[derive(Debug, Clone, Default)]
pub struct PruneOptions {
    /// Prune nodes older than this many days.
    pub max_age_days: Option<u32>,
    /// Whether to evaluate superseded memories; `None` uses the config.
    pub prune_superseded: Option<bool>,
    /// Grace window for superseded memories; `None` uses the config.
    pub superseded_age_days: Option<u32>,
    /// Compute counts without mutating anything.
    pub dry_run: bool,
}

/// Report of one prune pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneResult {
    pub nodes_pruned: usize,
    pub edges_pruned: usize,
    pub superseded_memories_pruned: usize,
    pub memories_evaluated: usize,
}

/// Store-level counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GogneeStats {
    pub nodes: i64,
    pub edges: i64,
    pub documents: i64,
    pub memories: i64,
}

#[derive(Debug, Clone)]
struct PendingDocument {
    text: String,
    source: Option<String>,
}

/// Node and edge IDs touched by one scoped pipeline run.
#[derive(Debug, Default)]
struct ProvenanceCollector {
    node_ids: Vec<String>,
    edge_ids: Vec<String>,
}

impl ProvenanceCollector {
    fn record_node(&mut self, id: &str) {
        if !self.node_ids.iter().any(|existing| existing == id) {
            self.node_ids.push(id.to_string());
        }
    }

    fn record_edge(&mut self, id: &str) {
        if !self.edge_ids.iter().any(|existing| existing == id) {
            self.edge_ids.push(id.to_string());
        }
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builder for [`Gognee`]. Observability sinks are optional; everything else
/// comes from [`GogneeConfig`].
pub struct GogneeBuilder<L, E> {
    llm: L,
    embedder: E,
    config: GogneeConfig,
    metrics: Option<Arc<dyn MetricsCollector>>,
    tracer: Option<Arc<dyn TraceExporter>>,
}

impl<L: LlmClient, E: EmbeddingClient> GogneeBuilder<L, E> {
    /// Replace the default configuration.
    pub fn config(mut self, config: GogneeConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a metrics sink.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Attach a trace exporter.
    pub fn tracer(mut self, tracer: Arc<dyn TraceExporter>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Open the store, migrate the schema, and assemble the facade.
    pub fn build(self) -> Result<Gognee<L, E>> {
        self.config
            .validate()
            .map_err(GogneeError::InvalidInput)?;

        let db = Db::open(&self.config.db_path)?;
        let graph = GraphStore::new(db.clone());
        let vectors = VectorStore::new(db.clone())?;
        let documents = DocumentTracker::new(db.clone());
        let memories = MemoryStore::new(db);

        tracing::info!(
            in_memory = self.config.is_in_memory(),
            embedding_dim = self.config.embedding_dim,
            "gognee store opened"
        );

        Ok(Gognee {
            chunker: Chunker::new(self.config.chunk_size, self.config.chunk_overlap),
            config: self.config,
            graph,
            vectors,
            documents,
            memories,
            extractor: Extractor::new(self.llm),
            embedder: self.embedder,
            buffer: Mutex::new(Vec::new()),
            query_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(QUERY_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            metrics: self.metrics,
            tracer: self.tracer,
        })
    }
}

/// Queries cached to avoid re-embedding repeats.
const QUERY_CACHE_CAPACITY: usize = 100;

// ============================================================================
// FACADE
// ============================================================================

/// Embeddable knowledge memory: ingestion, retrieval, and memory lifecycle
/// over one SQLite store.
pub struct Gognee<L, E> {
    config: GogneeConfig,
    chunker: Chunker,
    graph: GraphStore,
    vectors: VectorStore,
    documents: DocumentTracker,
    memories: MemoryStore,
    extractor: Extractor<L>,
    embedder: E,
    buffer: Mutex<Vec<PendingDocument>>,
    query_cache: Mutex<LruCache<String, Vec<f32>>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
    tracer: Option<Arc<dyn TraceExporter>>,
}

impl<L: LlmClient, E: EmbeddingClient> Gognee<L, E> {
    /// Start building a facade over the given clients.
    pub fn builder(llm: L, embedder: E) -> GogneeBuilder<L, E> {
        GogneeBuilder {
            llm,
            embedder,
            config: GogneeConfig::default(),
            metrics: None,
            tracer: None,
        }
    }

    /// Release the facade. The store connection closes with the value on any
    /// path; this is the explicit spelling.
    pub fn close(self) {}

    // ========================================================================
    // INGESTION
    // ========================================================================

    /// Buffer a document for the next [`Self::cognify`] run.
    pub fn add(&self, text: &str, source: Option<&str>) -> Result<()> {
        if text.trim().is_empty() {
            return Err(GogneeError::InvalidInput("document text is empty".to_string()));
        }
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| GogneeError::InvalidInput("ingestion buffer poisoned".to_string()))?;
        buffer.push(PendingDocument {
            text: text.to_string(),
            source: source.map(str::to_string),
        });
        Ok(())
    }

    /// Drain the buffer through the pipeline: chunk, extract, embed, upsert.
    ///
    /// The buffer is always cleared, even when individual documents or
    /// chunks fail; failures land in [`CognifyResult::errors`].
    pub async fn cognify(&self) -> Result<CognifyResult> {
        let started = Instant::now();
        let pending: Vec<PendingDocument> = {
            let mut buffer = self
                .buffer
                .lock()
                .map_err(|_| GogneeError::InvalidInput("ingestion buffer poisoned".to_string()))?;
            buffer.drain(..).collect()
        };

        let mut result = CognifyResult::default();
        for document in &pending {
            self.cognify_document(
                &document.text,
                document.source.as_deref(),
                self.config.force,
                &mut result,
                None,
            )
            .await?;
        }

        tracing::info!(
            documents_processed = result.documents_processed,
            documents_skipped = result.documents_skipped,
            chunks_failed = result.chunks_failed,
            edges_skipped = result.edges_skipped,
            "cognify finished"
        );
        if let Some(metrics) = &self.metrics {
            metrics.incr_counter("documents_processed", result.documents_processed as u64);
            metrics.incr_counter("documents_skipped", result.documents_skipped as u64);
            metrics.observe_duration("cognify", started.elapsed());
        }
        if let Some(tracer) = &self.tracer {
            tracer.export_span(
                "cognify",
                started.elapsed(),
                &[
                    ("documents", result.documents_processed.to_string()),
                    ("errors", result.errors.len().to_string()),
                ],
            );
        }
        Ok(result)
    }

    /// Run one document through the pipeline.
    ///
    /// `force` bypasses the processed-document skip; memory-scoped runs
    /// always force so provenance is collected even for known text.
    async fn cognify_document(
        &self,
        text: &str,
        source: Option<&str>,
        force: bool,
        result: &mut CognifyResult,
        mut provenance: Option<&mut ProvenanceCollector>,
    ) -> Result<()> {
        let hash = sha256_hex(text);
        if !force && self.config.skip_processed() && self.documents.is_processed(&hash)? {
            tracing::debug!(doc_hash = %hash, "document already processed; skipping");
            result.documents_skipped += 1;
            return Ok(());
        }

        let chunks = self.chunker.chunk(text);
        for (index, chunk) in chunks.iter().enumerate() {
            // Phase one: external calls, no database lock held.
            let entities = match self.extractor.extract_entities(chunk).await {
                Ok(entities) => entities,
                Err(e) => {
                    result.errors.push(format!("chunk {index}: entity extraction: {e}"));
                    result.chunks_failed += 1;
                    continue;
                }
            };

            let relations = match self.extractor.extract_relations(chunk, &entities).await {
                Ok(relations) => relations,
                Err(e) => {
                    result.errors.push(format!("chunk {index}: relation extraction: {e}"));
                    result.chunks_failed += 1;
                    continue;
                }
            };

            let embeddings = match self.embed_entities(&entities).await {
                Ok(embeddings) => embeddings,
                Err(e) => {
                    // Nodes still land, just without vectors.
                    result.errors.push(format!("chunk {index}: embedding: {e}"));
                    None
                }
            };

            // Phase two: short writes.
            for (position, entity) in entities.iter().enumerate() {
                let node = Node::new(entity.name.clone(), entity.entity_type)
                    .with_description(entity.description.clone());
                if !self.graph.contains_node(&node.id)? {
                    result.nodes_created += 1;
                }
                self.graph.upsert_node(&node)?;
                if let Some(vectors) = &embeddings {
                    if let Some(embedding) = vectors.get(position) {
                        self.vectors.add(&node.id, embedding)?;
                    }
                }
                if let Some(collector) = provenance.as_deref_mut() {
                    collector.record_node(&node.id);
                }
            }

            result.edges_skipped += relations.skipped;
            for triplet in &relations.triplets {
                let source_id =
                    crate::graph::node_id(&triplet.subject.name, triplet.subject.entity_type);
                let target_id =
                    crate::graph::node_id(&triplet.object.name, triplet.object.entity_type);
                let edge = Edge::new(source_id, triplet.relation.clone(), target_id);
                if !self.graph.contains_edge(&edge.id)? {
                    result.edges_created += 1;
                }
                self.graph.upsert_edge(&edge)?;
                if let Some(collector) = provenance.as_deref_mut() {
                    collector.record_edge(&edge.id);
                }
            }

            result.chunks_processed += 1;
        }

        self.documents.mark_processed(&hash, source, chunks.len())?;
        result.documents_processed += 1;
        Ok(())
    }

    /// One batched embedding call for a chunk's entities.
    async fn embed_entities(
        &self,
        entities: &[ExtractedEntity],
    ) -> std::result::Result<Option<Vec<Vec<f32>>>, EmbeddingError> {
        if entities.is_empty() {
            return Ok(None);
        }
        let texts: Vec<String> = entities
            .iter()
            .map(|entity| {
                if entity.description.is_empty() {
                    entity.name.clone()
                } else {
                    format!("{}: {}", entity.name, entity.description)
                }
            })
            .collect();
        Ok(Some(self.embedder.embed(&texts).await?))
    }

    // ========================================================================
    // MEMORY LIFECYCLE
    // ========================================================================

    /// Persist a memory record, run the pipeline on its canonical text, link
    /// provenance, and apply any declared supersessions.
    pub async fn add_memory(&self, input: MemoryInput) -> Result<MemoryRecord> {
        if input.topic.trim().is_empty() {
            return Err(GogneeError::InvalidInput("memory topic is empty".to_string()));
        }

        // Validate supersession targets before writing anything.
        let supersedes = input.supersedes.clone();
        let supersedes_reason = input.supersedes_reason.clone();
        for old_id in &supersedes {
            let target = self
                .memories
                .find_memory(old_id)?
                .ok_or_else(|| GogneeError::Conflict(format!("supersession target {old_id} not found")))?;
            if !matches!(target.status, MemoryStatus::Active | MemoryStatus::Superseded) {
                return Err(GogneeError::Conflict(format!(
                    "supersession target {old_id} has status {}",
                    target.status.as_str()
                )));
            }
        }

        let record = input.into_record(Utc::now());
        let (stored, created) = self.memories.create_memory(&record)?;

        if created {
            // Memory-scoped pipeline run, forced so provenance is collected
            // even when the canonical text was already processed.
            let mut collector = ProvenanceCollector::default();
            let mut pipeline = CognifyResult::default();
            self.cognify_document(
                &stored.canonical_text(),
                Some(&format!("memory:{}", stored.id)),
                true,
                &mut pipeline,
                Some(&mut collector),
            )
            .await?;
            for error in &pipeline.errors {
                tracing::warn!(memory_id = %stored.id, error = %error, "memory pipeline error");
            }
            self.memories
                .link_provenance(&stored.id, &collector.node_ids, &collector.edge_ids)?;
        }

        for old_id in &supersedes {
            self.memories
                .record_supersession(old_id, &stored.id, supersedes_reason.as_deref())?;
            self.memories.mark_superseded(old_id, &stored.id)?;
            tracing::info!(superseded = %old_id, superseding = %stored.id, "memory superseded");
        }

        if let Some(metrics) = &self.metrics {
            metrics.incr_counter("memories_created", created as u64);
        }

        Ok(self
            .memories
            .find_memory(&stored.id)?
            .ok_or_else(|| GogneeError::NotFound(format!("memory {}", stored.id)))?)
    }

    /// Apply a partial update, re-run the pipeline on the new canonical
    /// text, diff provenance, and collect artifacts the memory no longer
    /// references.
    pub async fn update_memory(&self, id: &str, updates: MemoryUpdate) -> Result<MemoryRecord> {
        let mut record = self
            .memories
            .find_memory(id)?
            .ok_or_else(|| GogneeError::NotFound(format!("memory {id}")))?;

        if let Some(topic) = updates.topic {
            record.topic = topic.trim().to_string();
        }
        if let Some(context) = updates.context {
            record.context = context.trim().to_string();
        }
        if let Some(decisions) = updates.decisions {
            record.decisions = decisions.iter().map(|d| d.trim().to_string()).collect();
        }
        if let Some(rationale) = updates.rationale {
            record.rationale = rationale.trim().to_string();
        }
        if let Some(metadata) = updates.metadata {
            record.metadata = metadata;
        }
        if let Some(policy) = updates.retention_policy {
            record.retention_policy = policy;
        }
        if let Some(retention_until) = updates.retention_until {
            record.retention_until = retention_until;
        }
        record.doc_hash =
            canonical_doc_hash(&record.topic, &record.context, &record.decisions, &record.rationale);
        record.updated_at = Utc::now();
        self.memories.update_memory(&record)?;

        // Re-cognify outside any transaction, then swap provenance.
        let mut collector = ProvenanceCollector::default();
        let mut pipeline = CognifyResult::default();
        self.cognify_document(
            &record.canonical_text(),
            Some(&format!("memory:{id}")),
            true,
            &mut pipeline,
            Some(&mut collector),
        )
        .await?;

        let (old_nodes, old_edges) = self.memories.unlink_provenance(id)?;
        self.memories
            .link_provenance(id, &collector.node_ids, &collector.edge_ids)?;

        let removed_nodes: Vec<String> = old_nodes
            .into_iter()
            .filter(|node_id| !collector.node_ids.contains(node_id))
            .collect();
        let removed_edges: Vec<String> = old_edges
            .into_iter()
            .filter(|edge_id| !collector.edge_ids.contains(edge_id))
            .collect();
        let outcome = self.memories.gc_candidates(&removed_nodes, &removed_edges)?;
        self.vectors.forget(&outcome.nodes_deleted)?;

        Ok(self
            .memories
            .find_memory(id)?
            .ok_or_else(|| GogneeError::NotFound(format!("memory {id}")))?)
    }

    /// Delete a memory: unlink provenance, collect artifacts nothing else
    /// references, then remove the record.
    pub fn delete_memory(&self, id: &str) -> Result<()> {
        if self.memories.find_memory(id)?.is_none() {
            return Err(GogneeError::NotFound(format!("memory {id}")));
        }

        let (node_ids, edge_ids) = self.memories.unlink_provenance(id)?;
        let outcome = self.memories.gc_candidates(&node_ids, &edge_ids)?;
        self.vectors.forget(&outcome.nodes_deleted)?;
        self.memories.delete_memory(id)?;

        tracing::info!(
            memory_id = %id,
            nodes_collected = outcome.nodes_deleted.len(),
            edges_collected = outcome.edges_deleted.len(),
            "memory deleted"
        );
        Ok(())
    }

    /// Get a memory by ID, recording the access.
    pub fn get_memory(&self, id: &str) -> Result<MemoryRecord> {
        Ok(self.memories.get_memory(id)?)
    }

    /// List memories with filters and paging.
    pub fn list_memories(&self, opts: ListMemoryOptions) -> Result<Vec<MemoryRecord>> {
        Ok(self.memories.list_memories(&opts)?)
    }

    /// Pin a memory against decay and pruning.
    pub fn pin_memory(&self, id: &str, reason: &str) -> Result<MemoryRecord> {
        self.memories.set_pinned(id, reason, Utc::now())?;
        Ok(self
            .memories
            .find_memory(id)?
            .ok_or_else(|| GogneeError::NotFound(format!("memory {id}")))?)
    }

    /// Clear a memory's pin.
    pub fn unpin_memory(&self, id: &str) -> Result<MemoryRecord> {
        self.memories.clear_pinned(id, Utc::now())?;
        Ok(self
            .memories
            .find_memory(id)?
            .ok_or_else(|| GogneeError::NotFound(format!("memory {id}")))?)
    }

    /// Full supersession chain containing `id`, oldest first.
    pub fn get_supersession_chain(&self, id: &str) -> Result<Vec<MemoryRecord>> {
        Ok(self.memories.supersession_chain(id)?)
    }

    // ========================================================================
    // PRUNE
    // ========================================================================

    /// Bounded pruning of old nodes and aged-out superseded memories.
    ///
    /// Protected and never pruned: permanent or pinned memories, and nodes
    /// reachable only from such memories. `dry_run` computes the same counts
    /// without mutating.
    pub fn prune(&self, opts: PruneOptions) -> Result<PruneResult> {
        let started = Instant::now();
        let now = Utc::now();
        let mut result = PruneResult::default();

        let prune_superseded = opts.prune_superseded.unwrap_or(self.config.prune_superseded);
        if prune_superseded {
            let grace = opts
                .superseded_age_days
                .unwrap_or(self.config.superseded_age_days);
            let cutoff = now - Duration::days(grace as i64);
            let candidates = self.memories.superseded_older_than(cutoff)?;
            result.memories_evaluated = candidates.len();

            for memory in candidates {
                if memory.pinned
                    || memory.status == MemoryStatus::Pinned
                    || memory.retention_policy == RetentionPolicy::Permanent
                {
                    continue;
                }
                if !opts.dry_run {
                    self.delete_memory(&memory.id)?;
                }
                result.superseded_memories_pruned += 1;
            }
        }

        if let Some(max_age_days) = opts.max_age_days {
            let cutoff = now - Duration::days(max_age_days as i64);
            let old_ids = self.graph.node_ids_older_than(cutoff)?;
            let protected: HashSet<String> =
                self.memories.protected_node_ids()?.into_iter().collect();

            let mut pruned_edges: HashSet<String> = HashSet::new();
            for node_id in old_ids {
                if protected.contains(&node_id) {
                    continue;
                }
                for edge in self.graph.get_edges(&node_id)? {
                    pruned_edges.insert(edge.id);
                }
                if !opts.dry_run {
                    self.graph.delete_node(&node_id)?;
                    self.vectors.forget(std::slice::from_ref(&node_id))?;
                }
                result.nodes_pruned += 1;
            }
            result.edges_pruned = pruned_edges.len();
        }

        tracing::info!(
            nodes_pruned = result.nodes_pruned,
            edges_pruned = result.edges_pruned,
            superseded_pruned = result.superseded_memories_pruned,
            dry_run = opts.dry_run,
            "prune finished"
        );
        if let Some(metrics) = &self.metrics {
            metrics.incr_counter("nodes_pruned", result.nodes_pruned as u64);
            metrics.observe_duration("prune", started.elapsed());
        }
        Ok(result)
    }

    // ========================================================================
    // SEARCH
    // ========================================================================

    /// Ranked retrieval: embed the query (cached), run the selected
    /// searcher under the decay decorator, filter, enrich with provenance,
    /// and reinforce access on the returned top-K.
    pub async fn search(&self, query: &str, opts: SearchOptions) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        if opts.search_type != SearchType::Graph && query.trim().is_empty() {
            return Err(GogneeError::InvalidInput("search query is empty".to_string()));
        }

        let embedding = match opts.search_type {
            SearchType::Graph => None,
            _ => Some(self.query_embedding(query).await?),
        };
        let search_query = SearchQuery {
            text: query.to_string(),
            embedding,
        };

        let decay = DecayConfig::from(&self.config);
        let mut results = match opts.search_type {
            SearchType::Vector => DecayingSearcher::new(
                VectorSearcher::new(&self.vectors, &self.graph),
                &self.memories,
                decay,
            )
            .search(&search_query, &opts)?,
            SearchType::Graph => DecayingSearcher::new(
                GraphSearcher::new(&self.graph),
                &self.memories,
                decay,
            )
            .search(&search_query, &opts)?,
            SearchType::Hybrid => DecayingSearcher::new(
                HybridSearcher::new(&self.vectors, &self.graph),
                &self.memories,
                decay,
            )
            .search(&search_query, &opts)?,
        };
        results.truncate(opts.top_k);

        // Provenance enrichment, one batched lookup.
        let node_ids: Vec<String> = results.iter().map(|r| r.node.id.clone()).collect();
        let provenance = self.memories.memory_ids_for_nodes(&node_ids)?;
        for result in &mut results {
            if let Some(memory_ids) = provenance.get(&result.node.id) {
                result.memory_ids = memory_ids.clone();
                result.memory_ids.sort();
            }
        }

        if let Some(filter) = &opts.retention_filter {
            let mut linked_ids: Vec<String> =
                results.iter().flat_map(|r| r.memory_ids.clone()).collect();
            linked_ids.sort();
            linked_ids.dedup();
            let records = self.memories.get_memories(&linked_ids)?;
            let matching: HashSet<&str> = records
                .iter()
                .filter(|m| filter.contains(&m.retention_policy))
                .map(|m| m.id.as_str())
                .collect();
            results.retain(|r| r.memory_ids.iter().any(|id| matching.contains(id.as_str())));
        }

        if opts.reinforce() && !results.is_empty() {
            let now = Utc::now();
            let touched_nodes: Vec<String> =
                results.iter().map(|r| r.node.id.clone()).collect();
            self.graph.update_access(&touched_nodes, now)?;
            let touched_memories: Vec<String> =
                results.iter().flat_map(|r| r.memory_ids.clone()).collect();
            self.memories.batch_update_access(&touched_memories, now)?;
        }

        tracing::debug!(
            results = results.len(),
            search_type = ?opts.search_type,
            "search finished"
        );
        if let Some(metrics) = &self.metrics {
            metrics.incr_counter("searches", 1);
            metrics.observe_duration("search", started.elapsed());
        }
        Ok(results)
    }

    /// Embed a query, memoized through the LRU cache.
    async fn query_embedding(&self, query: &str) -> Result<Vec<f32>> {
        if let Ok(mut cache) = self.query_cache.lock() {
            if let Some(hit) = cache.get(query) {
                return Ok(hit.clone());
            }
        }

        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let embedding = vectors
            .pop()
            .ok_or_else(|| GogneeError::InvalidInput("embedding client returned no vector".to_string()))?;

        if let Ok(mut cache) = self.query_cache.lock() {
            cache.put(query.to_string(), embedding.clone());
        }
        Ok(embedding)
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    /// Store-level counters.
    pub fn stats(&self) -> Result<GogneeStats> {
        Ok(GogneeStats {
            nodes: self.graph.node_count()?,
            edges: self.graph.edge_count()?,
            documents: self.documents.count()?,
            memories: self.memories.count()?,
        })
    }

    /// Forget every processed-document hash, forcing full reprocessing.
    pub fn reset_processed_documents(&self) -> Result<()> {
        Ok(self.documents.clear()?)
    }

    /// Access the graph store (seed lookups, direct inspection).
    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// Access the vector store.
    pub fn vectors(&self) -> &VectorStore {
        &self.vectors
    }

    /// Access the memory store.
    pub fn memories(&self) -> &MemoryStore {
        &self.memories
    }

    /// The active configuration.
    pub fn config(&self) -> &GogneeConfig {
        &self.config
    }
}

// ============================================================================
// TESTS
// ============================================================================
