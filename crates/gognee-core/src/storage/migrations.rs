//! Database Migrations
//!
//! Versioned, additive schema migrations. Columns added after v1 are nullable
//! or carry safe defaults so existing rows migrate without rewrites.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: graph, vectors, processed documents",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Access tracking columns on nodes",
        up: MIGRATION_V2_UP,
    },
    Migration {
        version: 3,
        description: "Memory records and provenance junctions",
        up: MIGRATION_V3_UP,
    },
    Migration {
        version: 4,
        description: "Supersession table and direct-superseder column",
        up: MIGRATION_V4_UP,
    },
    Migration {
        version: 5,
        description: "Retention policy columns",
        up: MIGRATION_V5_UP,
    },
    Migration {
        version: 6,
        description: "Pinning columns",
        up: MIGRATION_V6_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    node_type TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    embedding BLOB,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(node_type);
CREATE INDEX IF NOT EXISTS idx_nodes_created ON nodes(created_at);

CREATE TABLE IF NOT EXISTS edges (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    relation TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 1.0,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);

CREATE TABLE IF NOT EXISTS processed_documents (
    hash TEXT PRIMARY KEY,
    source TEXT,
    processed_at TEXT NOT NULL,
    chunk_count INTEGER NOT NULL DEFAULT 0
);

-- Vector rows keyed by node; mirrored into nodes.embedding for recovery
CREATE TABLE IF NOT EXISTS node_vectors (
    node_id TEXT PRIMARY KEY REFERENCES nodes(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    dimensions INTEGER NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Access tracking for decay scoring and reinforcement
const MIGRATION_V2_UP: &str = r#"
ALTER TABLE nodes ADD COLUMN last_accessed_at TEXT;
ALTER TABLE nodes ADD COLUMN access_count INTEGER NOT NULL DEFAULT 0;

CREATE INDEX IF NOT EXISTS idx_nodes_last_accessed ON nodes(last_accessed_at);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// V3: First-class memory records with provenance junctions
const MIGRATION_V3_UP: &str = r#"
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    topic TEXT NOT NULL,
    context TEXT NOT NULL DEFAULT '',
    decisions TEXT NOT NULL DEFAULT '[]',
    rationale TEXT NOT NULL DEFAULT '',
    metadata TEXT NOT NULL DEFAULT '{}',
    doc_hash TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed_at TEXT,
    status TEXT NOT NULL DEFAULT 'active'
);

CREATE INDEX IF NOT EXISTS idx_memories_status ON memories(status);
CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);

CREATE TABLE IF NOT EXISTS memory_nodes (
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    node_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    PRIMARY KEY (memory_id, node_id)
);

CREATE INDEX IF NOT EXISTS idx_memory_nodes_node ON memory_nodes(node_id);

CREATE TABLE IF NOT EXISTS memory_edges (
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    edge_id TEXT NOT NULL REFERENCES edges(id) ON DELETE CASCADE,
    PRIMARY KEY (memory_id, edge_id)
);

CREATE INDEX IF NOT EXISTS idx_memory_edges_edge ON memory_edges(edge_id);

UPDATE schema_version SET version = 3, applied_at = datetime('now');
"#;

/// V4: Explicit supersession chains
const MIGRATION_V4_UP: &str = r#"
CREATE TABLE IF NOT EXISTS memory_supersession (
    superseded_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    superseding_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    reason TEXT,
    created_at TEXT NOT NULL,
    PRIMARY KEY (superseded_id, superseding_id)
);

CREATE INDEX IF NOT EXISTS idx_supersession_superseding ON memory_supersession(superseding_id);

ALTER TABLE memories ADD COLUMN superseded_by TEXT;

UPDATE schema_version SET version = 4, applied_at = datetime('now');
"#;

/// V5: Retention policies
const MIGRATION_V5_UP: &str = r#"
ALTER TABLE memories ADD COLUMN retention_policy TEXT NOT NULL DEFAULT 'standard';
ALTER TABLE memories ADD COLUMN retention_until TEXT;

CREATE INDEX IF NOT EXISTS idx_memories_retention ON memories(retention_policy);

UPDATE schema_version SET version = 5, applied_at = datetime('now');
"#;

/// V6: Pinning
const MIGRATION_V6_UP: &str = r#"
ALTER TABLE memories ADD COLUMN pinned INTEGER NOT NULL DEFAULT 0;
ALTER TABLE memories ADD COLUMN pinned_at TEXT;
ALTER TABLE memories ADD COLUMN pinned_reason TEXT;

CREATE INDEX IF NOT EXISTS idx_memories_pinned ON memories(pinned);

UPDATE schema_version SET version = 6, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}

// ============================================================================
// TESTS
// ============================================================================
