//! Graph Searcher
//!
//! Structural retrieval: breadth-first expansion from caller-supplied seed
//! nodes, scored by hop distance. The query text is ignored; seeds define
//! the search entirely.

use std::collections::HashMap;

use crate::storage::GraphStore;

use super::{SearchError, SearchOptions, SearchQuery, SearchResult, SearchSource, Searcher};

/// Seed-based BFS over the graph store's recursive traversal.
pub struct GraphSearcher<'a> {
    graph: &'a GraphStore,
}

impl<'a> GraphSearcher<'a> {
    pub fn new(graph: &'a GraphStore) -> Self {
        Self { graph }
    }
}

impl Searcher for GraphSearcher<'_> {
    fn search(
        &self,
        _query: &SearchQuery,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if opts.seed_node_ids.is_empty() {
            return Err(SearchError::InvalidInput(
                "graph search requires seed node IDs".to_string(),
            ));
        }

        // Node ID -> shortest depth found across all seeds.
        let mut best: HashMap<String, SearchResult> = HashMap::new();

        for seed_id in &opts.seed_node_ids {
            if let Some(seed) = self.graph.get_node(seed_id)? {
                insert_if_shallower(&mut best, seed, 0);
            }
            for (node, depth) in self.graph.neighbors_with_depth(seed_id, opts.graph_depth)? {
                insert_if_shallower(&mut best, node, depth);
            }
        }

        let mut results: Vec<SearchResult> = best.into_values().collect();
        super::sort_by_score(&mut results);
        Ok(results)
    }
}

fn insert_if_shallower(
    best: &mut HashMap<String, SearchResult>,
    node: crate::graph::Node,
    depth: u32,
) {
    let candidate = SearchResult {
        score: 1.0 / (1.0 + depth as f64),
        node,
        source: SearchSource::Graph,
        graph_depth: depth,
        memory_ids: Vec::new(),
    };
    best.entry(candidate.node.id.clone())
        .and_modify(|existing| {
            if depth < existing.graph_depth {
                existing.graph_depth = depth;
                existing.score = candidate.score;
            }
        })
        .or_insert(candidate);
}

// ============================================================================
// TESTS
// ============================================================================
