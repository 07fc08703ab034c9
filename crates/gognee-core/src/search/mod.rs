//! Retrieval Module
//!
//! Three searchers (vector, graph, hybrid) behind one capability set, plus a
//! decay decorator implementing the same set. Searchers are synchronous: the
//! facade embeds the query once and hands every searcher the same
//! [`SearchQuery`], so no searcher ever talks to an external endpoint.

mod decay;
mod graph;
mod hybrid;
mod vector;

use serde::{Deserialize, Serialize};

pub use decay::{DecayConfig, DecayingSearcher};
pub use graph::GraphSearcher;
pub use hybrid::HybridSearcher;
pub use vector::VectorSearcher;

use crate::graph::Node;
use crate::memory::RetentionPolicy;
use crate::storage::StorageError;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Search error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Caller input was unusable (missing seeds, missing embedding).
    #[error("invalid search input: {0}")]
    InvalidInput(String),
    /// Store failure underneath the searcher.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ============================================================================
// QUERY & OPTIONS
// ============================================================================

/// Which searcher handles the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Vector,
    Graph,
    #[default]
    Hybrid,
}

impl SearchType {
    /// Parse from string name. `None` for unknown types; the facade surfaces
    /// that as an input-validation error.
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "vector" => Some(SearchType::Vector),
            "graph" => Some(SearchType::Graph),
            "hybrid" => Some(SearchType::Hybrid),
            _ => None,
        }
    }
}

/// A query after the facade resolved the embedding.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Raw query text (unused by the graph searcher).
    pub text: String,
    /// Query embedding, present whenever an embedding client was reachable.
    pub embedding: Option<Vec<f32>>,
}

/// Options shared by every searcher.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub search_type: SearchType,
    /// Number of results ultimately returned.
    pub top_k: usize,
    /// Traversal depth for graph expansion.
    pub graph_depth: u32,
    /// Seed node IDs; required by the graph searcher.
    pub seed_node_ids: Vec<String>,
    /// Keep only results with at least one linked memory under one of these
    /// policies. `None` disables the filter.
    pub retention_filter: Option<Vec<RetentionPolicy>>,
    /// Reinforce access counters on the returned top-K. `None` means the
    /// default (`true`).
    pub reinforce_access: Option<bool>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_type: SearchType::Hybrid,
            top_k: 10,
            graph_depth: 2,
            seed_node_ids: Vec::new(),
            retention_filter: None,
            reinforce_access: None,
        }
    }
}

impl SearchOptions {
    /// Effective reinforcement toggle (defaults to `true`).
    pub fn reinforce(&self) -> bool {
        self.reinforce_access.unwrap_or(true)
    }

    /// Candidate pool requested from the vector store: wider than `top_k`
    /// so hybrid expansion and decay re-ranking have something to work with.
    pub(crate) fn expansion_base(&self) -> usize {
        (self.top_k * 2).max(20)
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Which retrieval paths contributed to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Vector,
    Graph,
    Hybrid,
}

impl SearchSource {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSource::Vector => "vector",
            SearchSource::Graph => "graph",
            SearchSource::Hybrid => "hybrid",
        }
    }
}

/// One ranked retrieval result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub node: Node,
    pub score: f64,
    pub source: SearchSource,
    /// Hops from the retrieval origin (0 for pure vector hits).
    pub graph_depth: u32,
    /// Memories provenance-linked to this node; filled by the facade.
    #[serde(default)]
    pub memory_ids: Vec<String>,
}

// ============================================================================
// SEARCHER CAPABILITY
// ============================================================================

/// The single retrieval capability all searchers (and the decay decorator)
/// implement.
pub trait Searcher {
    /// Ranked retrieval for `query` under `opts`.
    fn search(&self, query: &SearchQuery, opts: &SearchOptions)
        -> Result<Vec<SearchResult>, SearchError>;
}

/// Sort results by score, descending, with a stable tiebreak on node ID.
pub(crate) fn sort_by_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.node.id.cmp(&b.node.id))
    });
}

// ============================================================================
// TESTS
// ============================================================================
