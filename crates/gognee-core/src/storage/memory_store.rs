//! Memory Store
//!
//! CRUD for memory records plus everything that ties memories to the graph:
//! provenance junctions, reference-counted garbage collection of shared
//! artifacts, supersession rows, and the batched lookups the decay scorer
//! depends on (one query per batch, never per row).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{Db, Result, StorageError};
use crate::memory::{ListMemoryOptions, MemoryRecord, MemoryStatus, RetentionPolicy};

/// Artifacts removed by a garbage-collection pass.
#[derive(Debug, Default)]
pub struct GcOutcome {
    pub nodes_deleted: Vec<String>,
    pub edges_deleted: Vec<String>,
}

/// Memory persistence over the shared connection.
pub struct MemoryStore {
    db: Db,
}

impl MemoryStore {
    pub(crate) fn new(db: Db) -> Self {
        Self { db }
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Insert a memory record, idempotent on `doc_hash`.
    ///
    /// Returns the stored record and whether a new row was created; an
    /// identical payload returns the existing record untouched.
    pub fn create_memory(&self, record: &MemoryRecord) -> Result<(MemoryRecord, bool)> {
        if let Some(existing) = self.find_by_doc_hash(&record.doc_hash)? {
            tracing::debug!(memory_id = %existing.id, "memory payload already stored");
            return Ok((existing, false));
        }

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO memories (
                 id, topic, context, decisions, rationale, metadata, doc_hash,
                 created_at, updated_at, access_count, last_accessed_at, status,
                 superseded_by, retention_policy, retention_until, pinned,
                 pinned_at, pinned_reason
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, NULL, ?10, NULL, ?11, ?12, 0, NULL, NULL)",
            params![
                record.id,
                record.topic,
                record.context,
                serde_json::to_string(&record.decisions).unwrap_or_else(|_| "[]".to_string()),
                record.rationale,
                serde_json::to_string(&record.metadata).unwrap_or_else(|_| "{}".to_string()),
                record.doc_hash,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
                record.status.as_str(),
                record.retention_policy.as_str(),
                record.retention_until.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok((record.clone(), true))
    }

    /// Read a memory without touching access counters.
    pub fn find_memory(&self, id: &str) -> Result<Option<MemoryRecord>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!("{MEMORY_SELECT} WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], row_to_memory).optional()?)
    }

    fn find_by_doc_hash(&self, doc_hash: &str) -> Result<Option<MemoryRecord>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!("{MEMORY_SELECT} WHERE doc_hash = ?1"))?;
        Ok(stmt.query_row(params![doc_hash], row_to_memory).optional()?)
    }

    /// Get a memory by ID, recording the access (bumps `last_accessed_at`
    /// and `access_count`).
    pub fn get_memory(&self, id: &str) -> Result<MemoryRecord> {
        {
            let conn = self.db.lock()?;
            let changed = conn.execute(
                "UPDATE memories SET last_accessed_at = ?1, access_count = access_count + 1
                 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), id],
            )?;
            if changed == 0 {
                return Err(StorageError::NotFound(format!("memory {id}")));
            }
        }
        self.find_memory(id)?
            .ok_or_else(|| StorageError::NotFound(format!("memory {id}")))
    }

    /// Batched access reinforcement across memory IDs: dedup then one UPDATE.
    pub fn batch_update_access(&self, ids: &[String], now: DateTime<Utc>) -> Result<()> {
        let mut unique: Vec<&String> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            return Ok(());
        }

        let placeholders = placeholder_list(unique.len(), 2);
        let sql = format!(
            "UPDATE memories SET last_accessed_at = ?1, access_count = access_count + 1
             WHERE id IN ({placeholders})"
        );
        let conn = self.db.lock()?;
        let mut values: Vec<String> = vec![now.to_rfc3339()];
        values.extend(unique.into_iter().cloned());
        conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    /// List memories with filters, ordering, and paging.
    pub fn list_memories(&self, opts: &ListMemoryOptions) -> Result<Vec<MemoryRecord>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(status) = opts.status {
            values.push(status.as_str().to_string());
            clauses.push(format!("status = ?{}", values.len()));
        }
        if let Some(policy) = opts.retention_policy {
            values.push(policy.as_str().to_string());
            clauses.push(format!("retention_policy = ?{}", values.len()));
        }
        if let Some(pinned) = opts.pinned {
            values.push(if pinned { "1" } else { "0" }.to_string());
            clauses.push(format!("pinned = ?{}", values.len()));
        }

        let mut sql = MEMORY_SELECT.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY {} {}",
            opts.order_by.column(),
            if opts.desc { "DESC" } else { "ASC" }
        ));
        if let Some(limit) = opts.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = opts.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let memories = stmt
            .query_map(params_from_iter(values), row_to_memory)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memories)
    }

    /// Rewrite the payload and retention fields of an existing record.
    pub fn update_memory(&self, record: &MemoryRecord) -> Result<()> {
        let conn = self.db.lock()?;
        let changed = conn.execute(
            "UPDATE memories SET
                 topic = ?1, context = ?2, decisions = ?3, rationale = ?4,
                 metadata = ?5, doc_hash = ?6, updated_at = ?7,
                 retention_policy = ?8, retention_until = ?9
             WHERE id = ?10",
            params![
                record.topic,
                record.context,
                serde_json::to_string(&record.decisions).unwrap_or_else(|_| "[]".to_string()),
                record.rationale,
                serde_json::to_string(&record.metadata).unwrap_or_else(|_| "{}".to_string()),
                record.doc_hash,
                record.updated_at.to_rfc3339(),
                record.retention_policy.as_str(),
                record.retention_until.map(|t| t.to_rfc3339()),
                record.id,
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("memory {}", record.id)));
        }
        Ok(())
    }

    /// Delete a memory record. Provenance and supersession rows cascade;
    /// graph artifacts never do.
    pub fn delete_memory(&self, id: &str) -> Result<bool> {
        let conn = self.db.lock()?;
        Ok(conn.execute("DELETE FROM memories WHERE id = ?1", params![id])? > 0)
    }

    // ========================================================================
    // STATUS TRANSITIONS
    // ========================================================================

    /// Mark `old_id` as superseded by `new_id`.
    pub fn mark_superseded(&self, old_id: &str, new_id: &str) -> Result<()> {
        let conn = self.db.lock()?;
        let changed = conn.execute(
            "UPDATE memories SET status = ?1, superseded_by = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                MemoryStatus::Superseded.as_str(),
                new_id,
                Utc::now().to_rfc3339(),
                old_id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("memory {old_id}")));
        }
        Ok(())
    }

    /// Pin a memory: sets the pin fields and moves status to `Pinned`.
    pub fn set_pinned(&self, id: &str, reason: &str, now: DateTime<Utc>) -> Result<()> {
        let conn = self.db.lock()?;
        let changed = conn.execute(
            "UPDATE memories SET pinned = 1, pinned_at = ?1, pinned_reason = ?2,
                 status = ?3, updated_at = ?1
             WHERE id = ?4",
            params![now.to_rfc3339(), reason, MemoryStatus::Pinned.as_str(), id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("memory {id}")));
        }
        Ok(())
    }

    /// Unpin a memory. Status falls back to `Superseded` when a superseder
    /// is recorded, otherwise `Active`.
    pub fn clear_pinned(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let conn = self.db.lock()?;
        let changed = conn.execute(
            "UPDATE memories SET pinned = 0, pinned_at = NULL, pinned_reason = NULL,
                 status = CASE WHEN superseded_by IS NOT NULL THEN 'superseded' ELSE 'active' END,
                 updated_at = ?1
             WHERE id = ?2",
            params![now.to_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("memory {id}")));
        }
        Ok(())
    }

    // ========================================================================
    // PROVENANCE
    // ========================================================================

    /// Link graph artifacts to a memory. Duplicate links are ignored.
    pub fn link_provenance(
        &self,
        memory_id: &str,
        node_ids: &[String],
        edge_ids: &[String],
    ) -> Result<()> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;
        {
            let mut node_stmt = tx.prepare(
                "INSERT OR IGNORE INTO memory_nodes (memory_id, node_id) VALUES (?1, ?2)",
            )?;
            for node_id in node_ids {
                node_stmt.execute(params![memory_id, node_id])?;
            }
            let mut edge_stmt = tx.prepare(
                "INSERT OR IGNORE INTO memory_edges (memory_id, edge_id) VALUES (?1, ?2)",
            )?;
            for edge_id in edge_ids {
                edge_stmt.execute(params![memory_id, edge_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Artifact IDs currently linked to a memory.
    pub fn provenance_ids(&self, memory_id: &str) -> Result<(Vec<String>, Vec<String>)> {
        let conn = self.db.lock()?;
        let mut node_stmt =
            conn.prepare("SELECT node_id FROM memory_nodes WHERE memory_id = ?1")?;
        let node_ids = node_stmt
            .query_map(params![memory_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        let mut edge_stmt =
            conn.prepare("SELECT edge_id FROM memory_edges WHERE memory_id = ?1")?;
        let edge_ids = edge_stmt
            .query_map(params![memory_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok((node_ids, edge_ids))
    }

    /// Remove every provenance link of a memory, returning what was linked.
    pub fn unlink_provenance(&self, memory_id: &str) -> Result<(Vec<String>, Vec<String>)> {
        let captured = self.provenance_ids(memory_id)?;
        let conn = self.db.lock()?;
        conn.execute("DELETE FROM memory_nodes WHERE memory_id = ?1", params![memory_id])?;
        conn.execute("DELETE FROM memory_edges WHERE memory_id = ?1", params![memory_id])?;
        Ok(captured)
    }

    /// Remaining provenance references to a node.
    pub fn count_node_references(&self, node_id: &str) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM memory_nodes WHERE node_id = ?1",
            params![node_id],
            |row| row.get(0),
        )?)
    }

    /// Remaining provenance references to an edge.
    pub fn count_edge_references(&self, edge_id: &str) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM memory_edges WHERE edge_id = ?1",
            params![edge_id],
            |row| row.get(0),
        )?)
    }

    /// Delete candidate artifacts whose provenance reference count dropped
    /// to zero.
    ///
    /// Candidates must come from a provenance capture: artifacts that never
    /// appeared in a junction table (legacy graph content) can never enter
    /// the candidate set and are therefore never collected here.
    pub fn gc_candidates(&self, node_ids: &[String], edge_ids: &[String]) -> Result<GcOutcome> {
        let mut outcome = GcOutcome::default();
        let conn = self.db.lock()?;

        for node_id in node_ids {
            let refs: i64 = conn.query_row(
                "SELECT COUNT(*) FROM memory_nodes WHERE node_id = ?1",
                params![node_id],
                |row| row.get(0),
            )?;
            if refs == 0 && conn.execute("DELETE FROM nodes WHERE id = ?1", params![node_id])? > 0 {
                outcome.nodes_deleted.push(node_id.clone());
            }
        }

        for edge_id in edge_ids {
            let refs: i64 = conn.query_row(
                "SELECT COUNT(*) FROM memory_edges WHERE edge_id = ?1",
                params![edge_id],
                |row| row.get(0),
            )?;
            if refs == 0 && conn.execute("DELETE FROM edges WHERE id = ?1", params![edge_id])? > 0 {
                outcome.edges_deleted.push(edge_id.clone());
            }
        }

        if !outcome.nodes_deleted.is_empty() || !outcome.edges_deleted.is_empty() {
            tracing::debug!(
                nodes = outcome.nodes_deleted.len(),
                edges = outcome.edges_deleted.len(),
                "garbage-collected unreferenced artifacts"
            );
        }
        Ok(outcome)
    }

    // ========================================================================
    // SUPERSESSION
    // ========================================================================

    /// Record that `new_id` supersedes `old_id`.
    pub fn record_supersession(
        &self,
        old_id: &str,
        new_id: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO memory_supersession
                 (superseded_id, superseding_id, reason, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![old_id, new_id, reason, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Full supersession chain containing `id`, oldest first.
    pub fn supersession_chain(&self, id: &str) -> Result<Vec<MemoryRecord>> {
        if self.find_memory(id)?.is_none() {
            return Err(StorageError::NotFound(format!("memory {id}")));
        }

        let mut chain: Vec<String> = vec![id.to_string()];

        // Walk backward to the oldest ancestor.
        let mut current = id.to_string();
        loop {
            let previous: Option<String> = {
                let conn = self.db.lock()?;
                conn.query_row(
                    "SELECT superseded_id FROM memory_supersession
                     WHERE superseding_id = ?1 ORDER BY created_at ASC LIMIT 1",
                    params![current],
                    |row| row.get(0),
                )
                .optional()?
            };
            match previous {
                Some(prev) if !chain.contains(&prev) => {
                    chain.insert(0, prev.clone());
                    current = prev;
                }
                _ => break,
            }
        }

        // Walk forward to the newest descendant.
        let mut current = id.to_string();
        loop {
            let next: Option<String> = {
                let conn = self.db.lock()?;
                conn.query_row(
                    "SELECT superseding_id FROM memory_supersession
                     WHERE superseded_id = ?1 ORDER BY created_at ASC LIMIT 1",
                    params![current],
                    |row| row.get(0),
                )
                .optional()?
            };
            match next {
                Some(next_id) if !chain.contains(&next_id) => {
                    chain.push(next_id.clone());
                    current = next_id;
                }
                _ => break,
            }
        }

        let mut records = Vec::with_capacity(chain.len());
        for member in chain {
            if let Some(record) = self.find_memory(&member)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    // ========================================================================
    // BATCHED LOOKUPS
    // ========================================================================

    /// Memory IDs linked to each of `node_ids`, resolved in one query.
    pub fn memory_ids_for_nodes(
        &self,
        node_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        self.memory_ids_for("memory_nodes", "node_id", node_ids)
    }

    /// Memory IDs linked to each of `edge_ids`, resolved in one query.
    pub fn memory_ids_for_edges(
        &self,
        edge_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        self.memory_ids_for("memory_edges", "edge_id", edge_ids)
    }

    fn memory_ids_for(
        &self,
        table: &str,
        column: &str,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = placeholder_list(ids.len(), 1);
        let sql =
            format!("SELECT {column}, memory_id FROM {table} WHERE {column} IN ({placeholders})");

        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (artifact_id, memory_id) in rows {
            map.entry(artifact_id).or_default().push(memory_id);
        }
        Ok(map)
    }

    /// Hydrate a batch of memory records in one query.
    pub fn get_memories(&self, ids: &[String]) -> Result<Vec<MemoryRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = placeholder_list(ids.len(), 1);
        let sql = format!("{MEMORY_SELECT} WHERE id IN ({placeholders})");
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let memories = stmt
            .query_map(params_from_iter(ids.iter()), row_to_memory)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memories)
    }

    /// Total memory count.
    pub fn count(&self) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?)
    }

    // ========================================================================
    // PRUNE SUPPORT
    // ========================================================================

    /// Superseded memories whose last update is older than `cutoff`.
    pub fn superseded_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<MemoryRecord>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{MEMORY_SELECT} WHERE status = 'superseded' AND updated_at < ?1"
        ))?;
        let memories = stmt
            .query_map(params![cutoff.to_rfc3339()], row_to_memory)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memories)
    }

    /// Node IDs whose every linked memory is protected (permanent, pinned,
    /// or status `Pinned`). These survive any prune.
    pub fn protected_node_ids(&self) -> Result<Vec<String>> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT mn.node_id FROM memory_nodes mn
             JOIN memories m ON m.id = mn.memory_id
             GROUP BY mn.node_id
             HAVING SUM(CASE
                 WHEN m.retention_policy = 'permanent' OR m.pinned = 1 OR m.status = 'pinned'
                 THEN 0 ELSE 1 END) = 0",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

const MEMORY_SELECT: &str = "SELECT id, topic, context, decisions, rationale, metadata,
    doc_hash, created_at, updated_at, access_count, last_accessed_at, status,
    superseded_by, retention_policy, retention_until, pinned, pinned_at,
    pinned_reason FROM memories";

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

fn row_to_memory(row: &Row) -> rusqlite::Result<MemoryRecord> {
    let decisions: String = row.get(3)?;
    let metadata: String = row.get(5)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    let last_accessed_at: Option<String> = row.get(10)?;
    let status: String = row.get(11)?;
    let retention_policy: String = row.get(13)?;
    let retention_until: Option<String> = row.get(14)?;
    let pinned: i64 = row.get(15)?;
    let pinned_at: Option<String> = row.get(16)?;

    Ok(MemoryRecord {
        id: row.get(0)?,
        topic: row.get(1)?,
        context: row.get(2)?,
        decisions: serde_json::from_str(&decisions).unwrap_or_default(),
        rationale: row.get(4)?,
        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
        doc_hash: row.get(6)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        access_count: row.get(9)?,
        last_accessed_at: last_accessed_at.as_deref().map(parse_timestamp).transpose()?,
        status: MemoryStatus::parse_name(&status),
        retention_policy: RetentionPolicy::parse_name(&retention_policy),
        retention_until: retention_until.as_deref().map(parse_timestamp).transpose()?,
        pinned: pinned != 0,
        pinned_at: pinned_at.as_deref().map(parse_timestamp).transpose()?,
        pinned_reason: row.get(17)?,
        superseded_by: row.get(12)?,
    })
}

fn placeholder_list(count: usize, start: usize) -> String {
    (0..count)
        .map(|i| format!("?{}", i + start))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// TESTS
// ============================================================================
