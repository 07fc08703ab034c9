//! Decay Decorator
//!
//! Wraps any [`Searcher`] and rescales its scores by a time-decay curve and
//! an access-frequency heat multiplier:
//!
//! `score × 0.5^(age_days / half_life) × (0.5 + 0.5 × heat)`
//!
//! Retention policies on provenance-linked memories override the configured
//! half-life; permanent or pinned memories force the whole multiplier to 1.0
//! so their knowledge never fades from results. Provenance and memory rows
//! are fetched in two batched queries, never per result.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::{DecayBasis, GogneeConfig};
use crate::memory::{MemoryRecord, MemoryStatus, RetentionPolicy};
use crate::storage::MemoryStore;

use super::{SearchError, SearchOptions, SearchQuery, SearchResult, Searcher};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Decay knobs lifted out of [`GogneeConfig`].
#[derive(Debug, Clone)]
pub struct DecayConfig {
    pub enabled: bool,
    pub half_life_days: f64,
    pub basis: DecayBasis,
    pub frequency_enabled: bool,
    pub reference_access_count: u32,
}

impl From<&GogneeConfig> for DecayConfig {
    fn from(config: &GogneeConfig) -> Self {
        Self {
            enabled: config.decay_enabled,
            half_life_days: config.decay_half_life_days,
            basis: config.decay_basis,
            frequency_enabled: config.access_frequency_enabled,
            reference_access_count: config.reference_access_count,
        }
    }
}

// ============================================================================
// DECAYING SEARCHER
// ============================================================================

/// Decorator applying decay multipliers to an inner searcher's results.
pub struct DecayingSearcher<'a, S> {
    inner: S,
    memories: &'a MemoryStore,
    config: DecayConfig,
    now: DateTime<Utc>,
}

impl<'a, S: Searcher> DecayingSearcher<'a, S> {
    pub fn new(inner: S, memories: &'a MemoryStore, config: DecayConfig) -> Self {
        Self {
            inner,
            memories,
            config,
            now: Utc::now(),
        }
    }

    /// Pin the evaluation time (tests).
    #[cfg(test)]
    fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn multiplier(&self, result: &SearchResult, linked: &[&MemoryRecord]) -> f64 {
        // Permanent or pinned provenance exempts the node entirely.
        if linked.iter().any(|m| {
            m.pinned
                || m.status == MemoryStatus::Pinned
                || m.retention_policy == RetentionPolicy::Permanent
        }) {
            return 1.0;
        }

        // The most retentive linked policy wins; nodes without provenance
        // use the configured half-life.
        let half_life = linked
            .iter()
            .filter_map(|m| m.retention_policy.half_life_days(self.config.half_life_days))
            .fold(None::<f64>, |acc, hl| Some(acc.map_or(hl, |a| a.max(hl))))
            .unwrap_or(self.config.half_life_days);

        let anchor = match self.config.basis {
            DecayBasis::Creation => result.node.created_at,
            DecayBasis::Access => result
                .node
                .last_accessed_at
                .unwrap_or(result.node.created_at),
        };
        let age_days = ((self.now - anchor).num_seconds() as f64 / 86_400.0).max(0.0);
        let time_decay = 0.5_f64.powf(age_days / half_life);

        let heat = if self.config.frequency_enabled {
            let access_count = linked
                .iter()
                .map(|m| m.access_count)
                .max()
                .unwrap_or(result.node.access_count)
                .max(0) as f64;
            let reference = self.config.reference_access_count as f64;
            ((access_count + 1.0).ln() / (reference + 1.0).ln()).min(1.0)
        } else {
            1.0
        };

        time_decay * (0.5 + 0.5 * heat)
    }
}

impl<S: Searcher> Searcher for DecayingSearcher<'_, S> {
    fn search(
        &self,
        query: &SearchQuery,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let mut results = self.inner.search(query, opts)?;
        if !self.config.enabled || results.is_empty() {
            return Ok(results);
        }

        let node_ids: Vec<String> = results.iter().map(|r| r.node.id.clone()).collect();
        let provenance = self.memories.memory_ids_for_nodes(&node_ids)?;

        let mut memory_ids: Vec<String> = provenance.values().flatten().cloned().collect();
        memory_ids.sort();
        memory_ids.dedup();
        let records: HashMap<String, MemoryRecord> = self
            .memories
            .get_memories(&memory_ids)?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        for result in &mut results {
            let linked: Vec<&MemoryRecord> = provenance
                .get(&result.node.id)
                .map(|ids| ids.iter().filter_map(|id| records.get(id)).collect())
                .unwrap_or_default();
            result.score *= self.multiplier(result, &linked);
        }

        super::sort_by_score(&mut results);
        Ok(results)
    }
}

// ============================================================================
// TESTS
// ============================================================================
