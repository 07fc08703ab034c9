//! Library Configuration
//!
//! Every tunable the facade honors lives here. `GogneeConfig::default()` is a
//! working configuration for an in-memory store; callers override what they
//! need and pass the result to [`crate::Gognee::builder`].

use serde::{Deserialize, Serialize};

// ============================================================================
// DECAY BASIS
// ============================================================================

/// Which timestamp anchors time-decay scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayBasis {
    /// Decay from `last_accessed_at`, falling back to `created_at` for rows
    /// that were never accessed.
    #[default]
    Access,
    /// Decay from `created_at` regardless of access history.
    Creation,
}

impl DecayBasis {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DecayBasis::Access => "access",
            DecayBasis::Creation => "creation",
        }
    }

    /// Parse from string name; unrecognized values fall back to `Access`.
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "creation" => DecayBasis::Creation,
            _ => DecayBasis::Access,
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for a [`crate::Gognee`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GogneeConfig {
    /// SQLite database file path. Empty or `":memory:"` selects an in-memory
    /// store that lives only as long as the instance.
    pub db_path: String,

    /// Approximate chunk size in whitespace tokens.
    pub chunk_size: usize,
    /// Approximate overlap between consecutive chunks, in whitespace tokens.
    pub chunk_overlap: usize,

    /// Expected embedding dimension. Stored vectors with a different
    /// dimension are skipped during search.
    pub embedding_dim: usize,

    /// Apply time/frequency decay multipliers to search scores.
    pub decay_enabled: bool,
    /// Half-life in days for the `standard` retention policy.
    pub decay_half_life_days: f64,
    /// Timestamp anchoring the decay curve.
    pub decay_basis: DecayBasis,

    /// Enable the access-frequency heat multiplier.
    pub access_frequency_enabled: bool,
    /// Access count at which heat saturates to 1.0. A global constant: every
    /// node and memory shares the same saturation point.
    pub reference_access_count: u32,

    /// Whether `prune` evaluates superseded memories at all.
    pub prune_superseded: bool,
    /// Grace window in days before a superseded memory becomes prunable.
    pub superseded_age_days: u32,

    /// Skip documents whose exact content hash was already processed.
    /// `None` means the default (`true`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_processed: Option<bool>,
    /// Reprocess documents regardless of the tracker.
    pub force: bool,
}

impl Default for GogneeConfig {
    fn default() -> Self {
        Self {
            db_path: String::new(),
            chunk_size: 512,
            chunk_overlap: 64,
            embedding_dim: 768,
            decay_enabled: false,
            decay_half_life_days: 30.0,
            decay_basis: DecayBasis::Access,
            access_frequency_enabled: false,
            reference_access_count: 10,
            prune_superseded: false,
            superseded_age_days: 30,
            skip_processed: None,
            force: false,
        }
    }
}

impl GogneeConfig {
    /// Whether the database lives in memory rather than on disk.
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_empty() || self.db_path == ":memory:"
    }

    /// Effective value of the skip-processed toggle (defaults to `true`).
    pub fn skip_processed(&self) -> bool {
        self.skip_processed.unwrap_or(true)
    }

    /// Validate the configuration before opening the store.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be positive".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.embedding_dim == 0 {
            return Err("embedding_dim must be positive".to_string());
        }
        if self.decay_half_life_days <= 0.0 {
            return Err("decay_half_life_days must be positive".to_string());
        }
        if self.reference_access_count == 0 {
            return Err("reference_access_count must be positive".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
