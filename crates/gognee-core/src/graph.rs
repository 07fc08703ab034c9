//! Knowledge Graph Types
//!
//! Nodes and edges of the typed property graph, the closed entity-type set,
//! and the deterministic identifier scheme. IDs are content-addressed: the
//! same entity or relation always hashes to the same 32-char hex ID, which is
//! what makes re-ingestion idempotent.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// ENTITY TYPES
// ============================================================================

/// Closed set of entity type tags recognized by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EntityType {
    Person,
    #[default]
    Concept,
    System,
    Decision,
    Event,
    Technology,
    Pattern,
    Problem,
    Goal,
    Location,
    Organization,
    Document,
    Process,
    Requirement,
    Feature,
    Task,
}

/// Every entity type, in prompt order.
pub const ENTITY_TYPES: [EntityType; 16] = [
    EntityType::Person,
    EntityType::Concept,
    EntityType::System,
    EntityType::Decision,
    EntityType::Event,
    EntityType::Technology,
    EntityType::Pattern,
    EntityType::Problem,
    EntityType::Goal,
    EntityType::Location,
    EntityType::Organization,
    EntityType::Document,
    EntityType::Process,
    EntityType::Requirement,
    EntityType::Feature,
    EntityType::Task,
];

impl EntityType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "Person",
            EntityType::Concept => "Concept",
            EntityType::System => "System",
            EntityType::Decision => "Decision",
            EntityType::Event => "Event",
            EntityType::Technology => "Technology",
            EntityType::Pattern => "Pattern",
            EntityType::Problem => "Problem",
            EntityType::Goal => "Goal",
            EntityType::Location => "Location",
            EntityType::Organization => "Organization",
            EntityType::Document => "Document",
            EntityType::Process => "Process",
            EntityType::Requirement => "Requirement",
            EntityType::Feature => "Feature",
            EntityType::Task => "Task",
        }
    }

    /// Parse from string name, case-insensitively. Returns `None` for tags
    /// outside the closed set; the extractor decides the fallback.
    pub fn parse_name(s: &str) -> Option<Self> {
        let lowered = s.trim().to_lowercase();
        ENTITY_TYPES
            .iter()
            .find(|t| t.as_str().to_lowercase() == lowered)
            .copied()
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Normalize a name or relation label for identity purposes: lowercase,
/// trimmed, whitespace runs collapsed to a single space.
pub fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase hex SHA-256 digest of `content`.
pub(crate) fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// 32-char hex digest used for graph identifiers.
fn short_hash(content: &str) -> String {
    let mut digest = sha256_hex(content);
    digest.truncate(32);
    digest
}

/// Deterministic node identifier from normalized name and type.
pub fn node_id(name: &str, entity_type: EntityType) -> String {
    short_hash(&format!("{}|{}", normalize(name), entity_type.as_str()))
}

/// Deterministic edge identifier from endpoint IDs and normalized relation.
pub fn edge_id(source_id: &str, relation: &str, target_id: &str) -> String {
    short_hash(&format!("{source_id}|{}|{target_id}", normalize(relation)))
}

// ============================================================================
// NODE
// ============================================================================

/// An entity in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Content-addressed identifier (32-char hex).
    pub id: String,
    /// Free-form entity name as extracted.
    pub name: String,
    /// Closed-set entity type tag.
    pub node_type: EntityType,
    /// Free-form description; last write wins on re-ingestion.
    #[serde(default)]
    pub description: String,
    /// Embedding vector, when one was produced for this node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// When the node was first created. Preserved across upserts.
    pub created_at: DateTime<Utc>,
    /// When the node last appeared in a reinforced search result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// Number of reinforced accesses.
    #[serde(default)]
    pub access_count: i64,
    /// Opaque metadata; merged last-write-wins on upsert.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Node {
    /// Create a new node with a deterministic ID and current timestamp.
    pub fn new(name: impl Into<String>, node_type: EntityType) -> Self {
        let name = name.into();
        Self {
            id: node_id(&name, node_type),
            name,
            node_type,
            description: String::new(),
            embedding: None,
            created_at: Utc::now(),
            last_accessed_at: None,
            access_count: 0,
            metadata: HashMap::new(),
        }
    }

    /// Builder-style description setter.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ============================================================================
// EDGE
// ============================================================================

/// A directed relation between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Content-addressed identifier (32-char hex).
    pub id: String,
    /// Source node ID.
    pub source_id: String,
    /// Target node ID.
    pub target_id: String,
    /// Free-form relation label as extracted.
    pub relation: String,
    /// Relation weight. Defaults to 1.0; reserved for future scoring.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// When the edge was first created. Preserved across upserts.
    pub created_at: DateTime<Utc>,
    /// Opaque metadata; merged last-write-wins on upsert.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_weight() -> f64 {
    1.0
}

impl Edge {
    /// Create a new edge with a deterministic ID and current timestamp.
    pub fn new(
        source_id: impl Into<String>,
        relation: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        let source_id = source_id.into();
        let target_id = target_id.into();
        let relation = relation.into();
        Self {
            id: edge_id(&source_id, &relation, &target_id),
            source_id,
            target_id,
            relation,
            weight: 1.0,
            created_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
