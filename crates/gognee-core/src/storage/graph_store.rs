//! Graph Store
//!
//! Nodes and edges over the shared connection. Upserts are idempotent by
//! content-addressed ID: re-ingesting an entity merges description and
//! metadata last-write-wins while preserving `created_at` and the access
//! counters. Traversal is recursive SQL, never pointer chasing.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::vector_store::bytes_to_vector;
use super::{Db, Result, StorageError};
use crate::graph::{Edge, EntityType, Node};

/// Graph persistence over the shared connection.
pub struct GraphStore {
    db: Db,
}

impl GraphStore {
    pub(crate) fn new(db: Db) -> Self {
        Self { db }
    }

    // ========================================================================
    // UPSERTS
    // ========================================================================

    /// Idempotent node upsert.
    ///
    /// On conflict the description (when non-empty) and metadata win last;
    /// `created_at`, `last_accessed_at`, and `access_count` are untouched.
    pub fn upsert_node(&self, node: &Node) -> Result<()> {
        let metadata = serde_json::to_string(&node.metadata).unwrap_or_else(|_| "{}".to_string());
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO nodes (id, name, node_type, description, metadata, created_at, access_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = CASE
                     WHEN excluded.description != '' THEN excluded.description
                     ELSE nodes.description
                 END,
                 metadata = json_patch(nodes.metadata, excluded.metadata)",
            params![
                node.id,
                node.name,
                node.node_type.as_str(),
                node.description,
                metadata,
                node.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Idempotent edge upsert. Both endpoints must exist (FK-enforced).
    pub fn upsert_edge(&self, edge: &Edge) -> Result<()> {
        let metadata = serde_json::to_string(&edge.metadata).unwrap_or_else(|_| "{}".to_string());
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO edges (id, source_id, target_id, relation, weight, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 weight = excluded.weight,
                 metadata = json_patch(edges.metadata, excluded.metadata)",
            params![
                edge.id,
                edge.source_id,
                edge.target_id,
                edge.relation,
                edge.weight,
                metadata,
                edge.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    /// Get a node by ID, hydrating every column including the access fields
    /// the decay scorer reads.
    pub fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!("{NODE_SELECT} WHERE id = ?1"))?;
        let node = stmt.query_row(params![id], row_to_node).optional()?;
        Ok(node)
    }

    /// Whether a node row exists.
    pub fn contains_node(&self, id: &str) -> Result<bool> {
        let conn = self.db.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether an edge row exists.
    pub fn contains_edge(&self, id: &str) -> Result<bool> {
        let conn = self.db.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM edges WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All nodes whose name matches case-insensitively.
    pub fn find_nodes_by_name(&self, name: &str) -> Result<Vec<Node>> {
        let conn = self.db.lock()?;
        let mut stmt =
            conn.prepare(&format!("{NODE_SELECT} WHERE name = ?1 COLLATE NOCASE ORDER BY node_type"))?;
        let nodes = stmt
            .query_map(params![name], row_to_node)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(nodes)
    }

    /// Single-result convenience form of [`Self::find_nodes_by_name`].
    /// Errors when the name is ambiguous across types.
    pub fn find_node_by_name(&self, name: &str) -> Result<Option<Node>> {
        let mut nodes = self.find_nodes_by_name(name)?;
        match nodes.len() {
            0 => Ok(None),
            1 => Ok(nodes.pop()),
            n => Err(StorageError::Ambiguous(format!("{n} nodes share this name"))),
        }
    }

    /// All edges incident to `node_id`, regardless of direction.
    pub fn get_edges(&self, node_id: &str) -> Result<Vec<Edge>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{EDGE_SELECT} WHERE source_id = ?1 OR target_id = ?1"
        ))?;
        let edges = stmt
            .query_map(params![node_id], row_to_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    // ========================================================================
    // TRAVERSAL
    // ========================================================================

    /// Unique nodes reachable within `depth` undirected hops of `node_id`,
    /// excluding the start, each with its shortest hop distance.
    ///
    /// One recursive CTE: the base case seeds the start at depth 0, the
    /// recursive case joins edges bidirectionally and increments depth, and
    /// termination comes from the depth bound. Cycles are absorbed by the
    /// UNION dedup plus the `MIN(depth)` projection.
    pub fn neighbors_with_depth(&self, node_id: &str, depth: u32) -> Result<Vec<(Node, u32)>> {
        if depth == 0 {
            return Ok(Vec::new());
        }
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "WITH RECURSIVE walk(id, depth_level) AS (
                 SELECT ?1, 0
                 UNION
                 SELECT CASE WHEN e.source_id = w.id THEN e.target_id ELSE e.source_id END,
                        w.depth_level + 1
                 FROM edges e
                 JOIN walk w ON w.id IN (e.source_id, e.target_id)
                 WHERE w.depth_level < ?2
             ),
             reach(id, depth_level) AS (
                 SELECT id, MIN(depth_level) FROM walk WHERE id != ?1 GROUP BY id
             )
             SELECT n.id, n.name, n.node_type, n.description, n.embedding, n.metadata,
                    n.created_at, n.last_accessed_at, n.access_count, r.depth_level
             FROM nodes n
             JOIN reach r ON n.id = r.id
             ORDER BY r.depth_level, n.id",
        )?;

        let rows = stmt
            .query_map(params![node_id, depth], |row| {
                let node = row_to_node(row)?;
                let depth: u32 = row.get(9)?;
                Ok((node, depth))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Set of unique nodes reachable within `depth` undirected hops.
    pub fn get_neighbors(&self, node_id: &str, depth: u32) -> Result<Vec<Node>> {
        Ok(self
            .neighbors_with_depth(node_id, depth)?
            .into_iter()
            .map(|(node, _)| node)
            .collect())
    }

    // ========================================================================
    // ACCESS TRACKING & DELETION
    // ========================================================================

    /// Batched access reinforcement: one UPDATE sets `last_accessed_at` and
    /// increments `access_count` for every distinct ID.
    pub fn update_access(&self, ids: &[String], now: DateTime<Utc>) -> Result<()> {
        let mut unique: Vec<&String> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            return Ok(());
        }

        let placeholders = (0..unique.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE nodes SET last_accessed_at = ?1, access_count = access_count + 1
             WHERE id IN ({placeholders})"
        );

        let conn = self.db.lock()?;
        let mut values: Vec<String> = vec![now.to_rfc3339()];
        values.extend(unique.into_iter().cloned());
        conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    /// Delete a node. Incident edges, vector rows, and provenance rows go
    /// with it via foreign-key cascades.
    pub fn delete_node(&self, id: &str) -> Result<bool> {
        let conn = self.db.lock()?;
        let changed = conn.execute("DELETE FROM nodes WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Total node count.
    pub fn node_count(&self) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?)
    }

    /// Total edge count.
    pub fn edge_count(&self) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?)
    }

    /// IDs of nodes created strictly before `cutoff`.
    pub fn node_ids_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM nodes WHERE created_at < ?1")?;
        let ids = stmt
            .query_map(params![cutoff.to_rfc3339()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

const NODE_SELECT: &str = "SELECT nodes.id, nodes.name, nodes.node_type, nodes.description,
    nodes.embedding, nodes.metadata, nodes.created_at, nodes.last_accessed_at,
    nodes.access_count FROM nodes";

const EDGE_SELECT: &str = "SELECT id, source_id, target_id, relation, weight, metadata,
    created_at FROM edges";

fn parse_timestamp(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid timestamp '{value}': {e}"),
                )),
            )
        })
}

fn row_to_node(row: &Row) -> rusqlite::Result<Node> {
    let node_type: String = row.get(2)?;
    let embedding: Option<Vec<u8>> = row.get(4)?;
    let metadata: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    let last_accessed_at: Option<String> = row.get(7)?;

    Ok(Node {
        id: row.get(0)?,
        name: row.get(1)?,
        node_type: EntityType::parse_name(&node_type).unwrap_or_default(),
        description: row.get(3)?,
        embedding: embedding.as_deref().and_then(bytes_to_vector),
        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
        created_at: parse_timestamp(&created_at)?,
        last_accessed_at: last_accessed_at.as_deref().map(parse_timestamp).transpose()?,
        access_count: row.get(8)?,
    })
}

fn row_to_edge(row: &Row) -> rusqlite::Result<Edge> {
    let metadata: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(Edge {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        relation: row.get(3)?,
        weight: row.get(4)?,
        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
        created_at: parse_timestamp(&created_at)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
