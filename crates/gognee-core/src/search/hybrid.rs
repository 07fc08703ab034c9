//! Hybrid Searcher
//!
//! Runs the vector searcher, expands every hit through the graph, and fuses
//! the two signals: `combined = vector_score + graph_score`, with a missing
//! component contributing zero. A node reached by both paths is tagged
//! `hybrid`; single-path nodes keep their origin tag.

use std::collections::HashMap;

use crate::storage::{GraphStore, VectorStore};

use super::{
    SearchError, SearchOptions, SearchQuery, SearchResult, SearchSource, Searcher, VectorSearcher,
};

/// Vector retrieval fused with neighbor expansion.
pub struct HybridSearcher<'a> {
    vectors: &'a VectorStore,
    graph: &'a GraphStore,
}

impl<'a> HybridSearcher<'a> {
    pub fn new(vectors: &'a VectorStore, graph: &'a GraphStore) -> Self {
        Self { vectors, graph }
    }
}

impl Searcher for HybridSearcher<'_> {
    fn search(
        &self,
        query: &SearchQuery,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let vector_hits = VectorSearcher::new(self.vectors, self.graph).search(query, opts)?;

        // Graph component: shortest depth at which expansion discovered each
        // node, across all vector hits.
        let mut discovered: HashMap<String, (crate::graph::Node, u32)> = HashMap::new();
        for hit in &vector_hits {
            for (node, depth) in self
                .graph
                .neighbors_with_depth(&hit.node.id, opts.graph_depth)?
            {
                discovered
                    .entry(node.id.clone())
                    .and_modify(|(_, d)| *d = (*d).min(depth))
                    .or_insert((node, depth));
            }
        }

        let mut merged: HashMap<String, SearchResult> = HashMap::new();
        for hit in vector_hits {
            merged.insert(hit.node.id.clone(), hit);
        }

        for (node_id, (node, depth)) in discovered {
            let graph_score = 1.0 / (1.0 + depth as f64);
            match merged.get_mut(&node_id) {
                Some(existing) => {
                    existing.score += graph_score;
                    existing.source = SearchSource::Hybrid;
                    existing.graph_depth = depth;
                }
                None => {
                    merged.insert(
                        node_id,
                        SearchResult {
                            node,
                            score: graph_score,
                            source: SearchSource::Graph,
                            graph_depth: depth,
                            memory_ids: Vec::new(),
                        },
                    );
                }
            }
        }

        let mut results: Vec<SearchResult> = merged.into_values().collect();
        super::sort_by_score(&mut results);
        results.truncate(opts.top_k);
        Ok(results)
    }
}

// ============================================================================
// TESTS
// ============================================================================
