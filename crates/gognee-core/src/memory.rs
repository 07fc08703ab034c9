//! Memory Records
//!
//! First-class memories layered over the knowledge graph. A memory owns a
//! payload (topic, context, decisions, rationale), lifecycle state (status,
//! retention policy, pinning, supersession) and provenance links to the graph
//! artifacts its ingestion produced.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::sha256_hex;

// ============================================================================
// STATUS & RETENTION
// ============================================================================

/// Lifecycle status of a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryStatus {
    /// Live memory.
    #[default]
    Active,
    /// Replaced by a newer memory; still readable and chain-traversable.
    Superseded,
    /// Pinned; exempt from decay and pruning.
    Pinned,
}

impl MemoryStatus {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryStatus::Active => "active",
            MemoryStatus::Superseded => "superseded",
            MemoryStatus::Pinned => "pinned",
        }
    }

    /// Parse from string name; unrecognized values fall back to `Active`.
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "superseded" => MemoryStatus::Superseded,
            "pinned" => MemoryStatus::Pinned,
            _ => MemoryStatus::Active,
        }
    }
}

/// Retention class dictating decay half-life and prune eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Never decays, never pruned.
    Permanent,
    /// Long-lived decisions: 365-day half-life.
    Decision,
    /// Uses the configured half-life.
    #[default]
    Standard,
    /// Short-lived working notes: 7-day half-life.
    Ephemeral,
    /// Scoped to roughly one working session: 1-day half-life.
    Session,
}

impl RetentionPolicy {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionPolicy::Permanent => "permanent",
            RetentionPolicy::Decision => "decision",
            RetentionPolicy::Standard => "standard",
            RetentionPolicy::Ephemeral => "ephemeral",
            RetentionPolicy::Session => "session",
        }
    }

    /// Parse from string name; unrecognized values fall back to `Standard`.
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "permanent" => RetentionPolicy::Permanent,
            "decision" => RetentionPolicy::Decision,
            "ephemeral" => RetentionPolicy::Ephemeral,
            "session" => RetentionPolicy::Session,
            _ => RetentionPolicy::Standard,
        }
    }

    /// Decay half-life in days under this policy. `None` means no decay.
    pub fn half_life_days(&self, standard_half_life: f64) -> Option<f64> {
        match self {
            RetentionPolicy::Permanent => None,
            RetentionPolicy::Decision => Some(365.0),
            RetentionPolicy::Standard => Some(standard_half_life),
            RetentionPolicy::Ephemeral => Some(7.0),
            RetentionPolicy::Session => Some(1.0),
        }
    }
}

// ============================================================================
// MEMORY RECORD
// ============================================================================

/// A first-class memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Stable identifier (UUID v4).
    pub id: String,
    /// Short subject line.
    pub topic: String,
    /// Narrative context.
    pub context: String,
    /// Decisions captured by this memory.
    #[serde(default)]
    pub decisions: Vec<String>,
    /// Why the decisions were made.
    #[serde(default)]
    pub rationale: String,
    /// Opaque metadata; excluded from the dedup hash.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Canonical-JSON SHA-256 of the payload; identical payloads dedup here.
    pub doc_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub access_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub status: MemoryStatus,
    pub retention_policy: RetentionPolicy,
    /// Absolute retention deadline, when one was set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned_reason: Option<String>,
    /// ID of the memory that directly superseded this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
}

impl MemoryRecord {
    /// Accesses per day since creation, as observed at `now`.
    ///
    /// The age floor is one hour so a record accessed right after creation
    /// does not report an absurd velocity.
    pub fn access_velocity(&self, now: DateTime<Utc>) -> f64 {
        let age_days = (now - self.created_at).num_seconds() as f64 / 86_400.0;
        self.access_count as f64 / age_days.max(1.0 / 24.0)
    }

    /// The canonical text this memory contributes to the graph pipeline.
    pub fn canonical_text(&self) -> String {
        canonical_text(&self.topic, &self.context, &self.decisions, &self.rationale)
    }
}

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Input for creating a memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInput {
    pub topic: String,
    pub context: String,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub retention_policy: RetentionPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_until: Option<DateTime<Utc>>,
    /// IDs of memories this one supersedes.
    #[serde(default)]
    pub supersedes: Vec<String>,
    /// Reason recorded on the supersession rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes_reason: Option<String>,
}

impl MemoryInput {
    /// Materialize a record with a fresh UUID and the canonical dedup hash.
    pub fn into_record(self, now: DateTime<Utc>) -> MemoryRecord {
        let doc_hash = canonical_doc_hash(&self.topic, &self.context, &self.decisions, &self.rationale);
        MemoryRecord {
            id: Uuid::new_v4().to_string(),
            topic: self.topic.trim().to_string(),
            context: self.context.trim().to_string(),
            decisions: self.decisions.iter().map(|d| d.trim().to_string()).collect(),
            rationale: self.rationale.trim().to_string(),
            metadata: self.metadata,
            doc_hash,
            created_at: now,
            updated_at: now,
            access_count: 0,
            last_accessed_at: None,
            status: MemoryStatus::Active,
            retention_policy: self.retention_policy,
            retention_until: self.retention_until,
            pinned: false,
            pinned_at: None,
            pinned_reason: None,
            superseded_by: None,
        }
    }
}

/// Partial update for an existing memory. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUpdate {
    pub topic: Option<String>,
    pub context: Option<String>,
    pub decisions: Option<Vec<String>>,
    pub rationale: Option<String>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub retention_policy: Option<RetentionPolicy>,
    pub retention_until: Option<Option<DateTime<Utc>>>,
}

// ============================================================================
// LISTING
// ============================================================================

/// Sort key for memory listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOrder {
    #[default]
    CreatedAt,
    UpdatedAt,
    AccessCount,
    LastAccessedAt,
}

impl MemoryOrder {
    /// Backing column name.
    pub fn column(&self) -> &'static str {
        match self {
            MemoryOrder::CreatedAt => "created_at",
            MemoryOrder::UpdatedAt => "updated_at",
            MemoryOrder::AccessCount => "access_count",
            MemoryOrder::LastAccessedAt => "last_accessed_at",
        }
    }
}

/// Filters and paging for [`crate::Gognee::list_memories`].
#[derive(Debug, Clone, Default)]
pub struct ListMemoryOptions {
    pub status: Option<MemoryStatus>,
    pub retention_policy: Option<RetentionPolicy>,
    pub pinned: Option<bool>,
    pub order_by: MemoryOrder,
    pub desc: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// ============================================================================
// CANONICAL HASHING
// ============================================================================

/// Canonical text fed to the ingestion pipeline for a memory payload.
pub fn canonical_text(topic: &str, context: &str, decisions: &[String], rationale: &str) -> String {
    let mut parts = vec![topic.trim().to_string(), context.trim().to_string()];
    for decision in decisions {
        parts.push(decision.trim().to_string());
    }
    if !rationale.trim().is_empty() {
        parts.push(rationale.trim().to_string());
    }
    parts.retain(|p| !p.is_empty());
    parts.join("\n")
}

/// Canonical-JSON SHA-256 of a memory payload.
///
/// Keys are sorted (serde_json maps are ordered), strings trimmed, and
/// metadata excluded, so payloads differing only in metadata or key order
/// hash identically.
pub fn canonical_doc_hash(
    topic: &str,
    context: &str,
    decisions: &[String],
    rationale: &str,
) -> String {
    let canonical = serde_json::json!({
        "context": context.trim(),
        "decisions": decisions.iter().map(|d| d.trim()).collect::<Vec<_>>(),
        "rationale": rationale.trim(),
        "topic": topic.trim(),
    });
    // Serialization of a serde_json map is key-ordered, which makes the
    // digest independent of construction order.
    sha256_hex(&canonical.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
