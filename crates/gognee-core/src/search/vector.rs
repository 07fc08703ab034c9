//! Vector Searcher
//!
//! Pure similarity retrieval: ranks nodes by cosine similarity of their
//! stored embeddings against the query embedding. Returns a pool wider than
//! `top_k` so hybrid expansion and decay re-ranking have an expansion base;
//! the facade truncates after scoring is final.

use crate::storage::{GraphStore, VectorStore};

use super::{SearchError, SearchOptions, SearchQuery, SearchResult, SearchSource, Searcher};

/// Similarity search over the vector store, hydrated from the graph store.
pub struct VectorSearcher<'a> {
    vectors: &'a VectorStore,
    graph: &'a GraphStore,
}

impl<'a> VectorSearcher<'a> {
    pub fn new(vectors: &'a VectorStore, graph: &'a GraphStore) -> Self {
        Self { vectors, graph }
    }
}

impl Searcher for VectorSearcher<'_> {
    fn search(
        &self,
        query: &SearchQuery,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let Some(embedding) = query.embedding.as_deref() else {
            return Err(SearchError::InvalidInput(
                "vector search requires a query embedding".to_string(),
            ));
        };

        let candidates = self.vectors.search(embedding, opts.expansion_base())?;

        let mut results = Vec::with_capacity(candidates.len());
        for (node_id, score) in candidates {
            // A vector row can outlive its node briefly; stale hits are
            // skipped, not errors.
            match self.graph.get_node(&node_id)? {
                Some(node) => results.push(SearchResult {
                    node,
                    score: score as f64,
                    source: SearchSource::Vector,
                    graph_depth: 0,
                    memory_ids: Vec::new(),
                }),
                None => {
                    tracing::debug!(node_id = %node_id, "skipping stale vector row");
                }
            }
        }
        Ok(results)
    }
}

// ============================================================================
// TESTS
// ============================================================================
