//! SQLite database module for learnplaces and their blocks
//!
//! ## Tables
//!
//! - `learnplaces` - One row per host object (location, timestamps)
//! - `configurations` - Per-object settings (default visibility, map zoom)
//! - `blocks` - All blocks; `learnplace_id` / `accordion_id` name the container
//! - `ilias_link_blocks` - Link target of link blocks, unique per block

pub mod blocks;
pub mod configurations;
pub mod ilias_links;
pub mod learnplaces;
pub mod schema;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, ErrorCode, Transaction};
use tracing::{debug, info};

use crate::error::LearnplaceError;

/// SQLite database for learnplaces
pub struct LearnplaceDb {
    conn: Mutex<Connection>,
}

impl LearnplaceDb {
    /// Open or create the database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self, LearnplaceError> {
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, LearnplaceError> {
        debug!("Opening in-memory SQLite database");
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, LearnplaceError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Run a read operation
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, LearnplaceError>
    where
        F: FnOnce(&Connection) -> Result<T, LearnplaceError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| LearnplaceError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, LearnplaceError>
    where
        F: FnOnce(&mut Connection) -> Result<T, LearnplaceError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| LearnplaceError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Run `f` inside a transaction; commits on `Ok`, rolls back on `Err`
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, LearnplaceError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, LearnplaceError>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, LearnplaceError> {
        self.with_conn(|conn| {
            let count = |sql: &str| -> Result<u64, LearnplaceError> {
                let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
                Ok(n as u64)
            };

            Ok(DbStats {
                learnplace_count: count("SELECT COUNT(*) FROM learnplaces")?,
                block_count: count("SELECT COUNT(*) FROM blocks")?,
                unplaced_block_count: count(
                    "SELECT COUNT(*) FROM blocks WHERE learnplace_id IS NULL AND accordion_id IS NULL",
                )?,
                link_row_count: count("SELECT COUNT(*) FROM ilias_link_blocks")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub learnplace_count: u64,
    pub block_count: u64,
    pub unplaced_block_count: u64,
    pub link_row_count: u64,
}

/// Map a UNIQUE constraint failure to `Conflict`, everything else to `Database`
pub(crate) fn map_unique_violation(err: rusqlite::Error, what: &str) -> LearnplaceError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            LearnplaceError::Conflict(what.to_string())
        }
        _ => LearnplaceError::Database(err),
    }
}

// Re-exports
pub use blocks::BlockRow;
pub use configurations::ConfigurationRow;
pub use ilias_links::IliasLinkBlockRow;
pub use learnplaces::LearnplaceRow;
