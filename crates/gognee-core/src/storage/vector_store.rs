//! Vector Store
//!
//! Embeddings are persisted as blobs in `node_vectors` (and mirrored into
//! `nodes.embedding` for recovery) while an in-process map serves cosine
//! search. The map is rebuilt from the persisted rows at open, so a
//! file-backed store searches correctly after reopen without re-ingesting.
//!
//! The store does not own the connection: `close` is a no-op.

use std::collections::HashMap;
use std::sync::Mutex;

use rusqlite::params;

use super::{Db, Result, StorageError};

// ============================================================================
// BYTE CODEC
// ============================================================================

/// Encode a vector as little-endian f32 bytes.
pub(crate) fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into a vector.
pub(crate) fn bytes_to_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

/// Cosine similarity of two equal-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

// ============================================================================
// VECTOR STORE
// ============================================================================

/// Vector persistence and cosine search keyed by node ID.
pub struct VectorStore {
    db: Db,
    index: Mutex<HashMap<String, Vec<f32>>>,
}

impl VectorStore {
    /// Create a store over the shared connection, rebuilding the in-process
    /// index from persisted rows.
    pub(crate) fn new(db: Db) -> Result<Self> {
        let store = Self {
            db,
            index: Mutex::new(HashMap::new()),
        };
        store.load_index()?;
        Ok(store)
    }

    /// Load persisted vectors into the in-process index.
    fn load_index(&self) -> Result<()> {
        let rows: Vec<(String, Vec<u8>)> = {
            let conn = self.db.lock()?;
            let mut stmt = conn.prepare("SELECT node_id, embedding FROM node_vectors")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .filter_map(|r| r.ok())
                .collect();
            rows
        };

        let mut index = self.lock_index()?;
        for (node_id, bytes) in rows {
            match bytes_to_vector(&bytes) {
                Some(vector) => {
                    index.insert(node_id, vector);
                }
                None => tracing::warn!(node_id = %node_id, "discarding malformed vector row"),
            }
        }
        tracing::debug!(vectors = index.len(), "vector index loaded");
        Ok(())
    }

    fn lock_index(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<f32>>>> {
        self.index
            .lock()
            .map_err(|_| StorageError::Init("vector index lock poisoned".to_string()))
    }

    /// Number of vectors in the store.
    pub fn len(&self) -> usize {
        self.lock_index().map(|index| index.len()).unwrap_or(0)
    }

    /// Whether the store holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist `embedding` for `node_id` and update the index.
    ///
    /// The node row must already exist. The blob is also mirrored into
    /// `nodes.embedding`.
    pub fn add(&self, node_id: &str, embedding: &[f32]) -> Result<()> {
        let bytes = vector_to_bytes(embedding);
        {
            let conn = self.db.lock()?;
            conn.execute(
                "INSERT INTO node_vectors (node_id, embedding, dimensions)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(node_id) DO UPDATE SET
                     embedding = excluded.embedding,
                     dimensions = excluded.dimensions",
                params![node_id, bytes, embedding.len() as i64],
            )?;
            conn.execute(
                "UPDATE nodes SET embedding = ?1 WHERE id = ?2",
                params![bytes, node_id],
            )?;
        }

        self.lock_index()?.insert(node_id.to_string(), embedding.to_vec());
        Ok(())
    }

    /// Top-K cosine search, scores descending.
    ///
    /// Rows whose stored dimension differs from the query dimension are
    /// skipped silently: no error, no partial ranking.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(String, f32)>> {
        if query.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let index = self.lock_index()?;
        let mut scored: Vec<(String, f32)> = Vec::new();
        let mut skipped = 0usize;
        for (node_id, vector) in index.iter() {
            if vector.len() != query.len() {
                skipped += 1;
                continue;
            }
            scored.push((node_id.clone(), cosine_similarity(query, vector)));
        }
        if skipped > 0 {
            tracing::debug!(skipped, "skipped dimension-mismatched vector rows");
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Remove the vector for `node_id`. Returns whether one existed.
    pub fn delete(&self, node_id: &str) -> Result<bool> {
        {
            let conn = self.db.lock()?;
            conn.execute("DELETE FROM node_vectors WHERE node_id = ?1", params![node_id])?;
            conn.execute(
                "UPDATE nodes SET embedding = NULL WHERE id = ?1",
                params![node_id],
            )?;
        }
        Ok(self.lock_index()?.remove(node_id).is_some())
    }

    /// Drop index entries for node IDs that were deleted elsewhere (cascade
    /// deletes clear the rows but not the in-process map).
    pub(crate) fn forget(&self, node_ids: &[String]) -> Result<()> {
        let mut index = self.lock_index()?;
        for node_id in node_ids {
            index.remove(node_id);
        }
        Ok(())
    }

    /// The store shares the facade's connection; closing is a no-op.
    pub fn close(&self) {}
}

// ============================================================================
// TESTS
// ============================================================================
