//! Storage Module
//!
//! A single SQLite database holds the whole store: graph nodes and edges,
//! vector rows, processed-document hashes, memory records, provenance
//! junctions, and supersession rows. One connection is shared by every store
//! through [`Db`]; stores never own the connection lifecycle.

mod documents;
mod graph_store;
mod memory_store;
mod migrations;
mod vector_store;

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

pub use documents::DocumentTracker;
pub use graph_store::GraphStore;
pub use memory_store::{GcOutcome, MemoryStore};
pub use migrations::MIGRATIONS;
pub use vector_store::{cosine_similarity, VectorStore};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Requested row does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// A single-result lookup matched more than one row
    #[error("ambiguous lookup: {0}")]
    Ambiguous(String),
    /// Open or migration failure
    #[error("initialization error: {0}")]
    Init(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// SHARED CONNECTION
// ============================================================================

/// Shared handle to the one SQLite connection behind every store.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open the database at `path` (in-memory when empty or `":memory:"`),
    /// apply pragmas, and bring the schema forward.
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path.is_empty() || path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };

        Self::configure_connection(&conn)?;
        migrations::apply_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Apply PRAGMAs to a fresh connection.
    ///
    /// `journal_mode` returns a row, so each pragma goes through
    /// `pragma_update` rather than a batch.
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Ok(())
    }

    /// Lock the connection for a short synchronous section.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Init("connection lock poisoned".to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
