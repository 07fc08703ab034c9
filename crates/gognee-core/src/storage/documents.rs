//! Processed-Document Tracker
//!
//! Records the SHA-256 of every document that finished ingestion so a
//! re-submitted document can be skipped. The hash covers the exact text: any
//! change, including whitespace, is a new document.

use chrono::Utc;
use rusqlite::params;

use super::{Db, Result};

/// Tracks processed-document content hashes.
pub struct DocumentTracker {
    db: Db,
}

impl DocumentTracker {
    pub(crate) fn new(db: Db) -> Self {
        Self { db }
    }

    /// Whether a document with this content hash was already processed.
    pub fn is_processed(&self, hash: &str) -> Result<bool> {
        let conn = self.db.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM processed_documents WHERE hash = ?1",
            params![hash],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Record a processed document. Idempotent: re-marking refreshes the
    /// timestamp, source, and chunk count.
    pub fn mark_processed(&self, hash: &str, source: Option<&str>, chunk_count: usize) -> Result<()> {
        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO processed_documents (hash, source, processed_at, chunk_count)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(hash) DO UPDATE SET
                 source = excluded.source,
                 processed_at = excluded.processed_at,
                 chunk_count = excluded.chunk_count",
            params![hash, source, Utc::now().to_rfc3339(), chunk_count as i64],
        )?;
        Ok(())
    }

    /// Number of tracked documents.
    pub fn count(&self) -> Result<i64> {
        let conn = self.db.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM processed_documents", [], |row| row.get(0))?)
    }

    /// Forget every tracked document.
    pub fn clear(&self) -> Result<()> {
        let conn = self.db.lock()?;
        conn.execute("DELETE FROM processed_documents", [])?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
