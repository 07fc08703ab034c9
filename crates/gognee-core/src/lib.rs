//! # Gognee Core
//!
//! Embeddable knowledge memory for AI assistants. Free-form text goes in;
//! a typed property graph with vector embeddings comes out, with retrieval
//! that blends semantic similarity, graph structure, and memory lifecycle:
//!
//! - **Ingestion pipeline**: chunking, two-stage LLM extraction (entities,
//!   then relations), batched embeddings, deterministic upserts, and
//!   incremental skip by document hash
//! - **Unified SQLite store**: graph, vectors, processed documents, memory
//!   records, provenance, and supersession in one database with additive
//!   schema migrations
//! - **Retrieval**: vector / graph-BFS / hybrid searchers plus a decay
//!   decorator (time decay × access-frequency heat, retention overrides)
//! - **Memory lifecycle**: provenance-tracked CRUD, reference-counted GC,
//!   supersession chains, retention policies, pinning, and bounded pruning
//!   with dry-run
//!
//! The LLM and embedding endpoints are capability traits the host
//! implements ([`LlmClient`], [`EmbeddingClient`]); the library makes no
//! network calls of its own.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gognee_core::{Gognee, GogneeConfig, MemoryInput, SearchOptions};
//!
//! let gognee = Gognee::builder(my_llm, my_embedder)
//!     .config(GogneeConfig { db_path: "kg.db".into(), ..Default::default() })
//!     .build()?;
//!
//! gognee.add("Alice works with Bob at Acme.", Some("notes.txt"))?;
//! let report = gognee.cognify().await?;
//!
//! let memory = gognee.add_memory(MemoryInput {
//!     topic: "decision-x".into(),
//!     context: "pick Go over Rust".into(),
//!     decisions: vec!["use Go".into()],
//!     ..Default::default()
//! }).await?;
//!
//! let hits = gognee.search("language choice", SearchOptions::default()).await?;
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod chunk;
pub mod clients;
pub mod config;
pub mod extract;
pub mod gognee;
pub mod graph;
pub mod memory;
pub mod observe;
pub mod search;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Facade
pub use gognee::{
    CognifyResult, Gognee, GogneeBuilder, GogneeError, GogneeStats, PruneOptions, PruneResult,
    Result,
};

// Configuration
pub use config::{DecayBasis, GogneeConfig};

// Graph types
pub use graph::{edge_id, node_id, normalize, Edge, EntityType, Node, ENTITY_TYPES};

// Memory types
pub use memory::{
    canonical_doc_hash, ListMemoryOptions, MemoryInput, MemoryOrder, MemoryRecord, MemoryStatus,
    MemoryUpdate, RetentionPolicy,
};

// Client capabilities
pub use clients::{EmbeddingClient, EmbeddingError, LlmClient, LlmError};

// Extraction
pub use extract::{ExtractError, ExtractedEntity, Extractor, RelationExtraction, ResolvedTriplet};

// Search
pub use search::{
    DecayConfig, DecayingSearcher, GraphSearcher, HybridSearcher, SearchError, SearchOptions,
    SearchQuery, SearchResult, SearchSource, SearchType, Searcher, VectorSearcher,
};

// Storage layer
pub use storage::{
    cosine_similarity, DocumentTracker, GraphStore, MemoryStore, StorageError, VectorStore,
};

// Chunking
pub use chunk::{split_sentences, Chunker};

// Observability sinks
pub use observe::{MetricsCollector, TraceExporter};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        CognifyResult, EmbeddingClient, EntityType, Gognee, GogneeConfig, GogneeError,
        ListMemoryOptions, LlmClient, MemoryInput, MemoryRecord, MemoryStatus, PruneOptions,
        Result, RetentionPolicy, SearchOptions, SearchResult, SearchType,
    };
}
