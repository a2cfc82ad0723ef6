//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::error::LearnplaceError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), LearnplaceError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        migrate_schema(conn, current_version)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(LearnplaceError::Config(format!(
            "database schema v{} is newer than supported v{}",
            current_version, SCHEMA_VERSION
        )));
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, LearnplaceError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), LearnplaceError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<(), LearnplaceError> {
    conn.execute_batch(LEARNPLACES_SCHEMA)?;
    conn.execute_batch(BLOCKS_SCHEMA)?;
    conn.execute_batch(INDEXES_SCHEMA)?;
    Ok(())
}

fn migrate_schema(conn: &Connection, from_version: i32) -> Result<(), LearnplaceError> {
    // Only v1 exists so far; the tables are created idempotently.
    info!(from_version, "Re-applying table definitions");
    create_tables(conn)?;
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

/// Learnplaces and per-object configuration
const LEARNPLACES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS learnplaces (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    object_id INTEGER NOT NULL UNIQUE,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    elevation REAL NOT NULL DEFAULT 0,
    radius INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS configurations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    object_id INTEGER NOT NULL UNIQUE,
    online INTEGER NOT NULL DEFAULT 0,
    default_visibility TEXT NOT NULL DEFAULT 'ALWAYS',
    map_zoom_level INTEGER NOT NULL DEFAULT 7,
    map_zoom INTEGER NOT NULL DEFAULT 1
);
"#;

/// Blocks and the link block association rows
const BLOCKS_SCHEMA: &str = r#"
-- A block sits in at most one container: a learnplace or an accordion block.
-- Rows with neither are stored but not yet placed.
CREATE TABLE IF NOT EXISTS blocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    sequence INTEGER NOT NULL DEFAULT 0,
    visibility TEXT NOT NULL DEFAULT 'ALWAYS',
    payload_json TEXT,
    learnplace_id INTEGER REFERENCES learnplaces(id) ON DELETE CASCADE,
    accordion_id INTEGER REFERENCES blocks(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    CHECK (learnplace_id IS NULL OR accordion_id IS NULL)
);

-- Link target of a link block; fk_block_id is unique so a block has at most one row.
CREATE TABLE IF NOT EXISTS ilias_link_blocks (
    pk_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ref_id INTEGER NOT NULL,
    fk_block_id INTEGER UNIQUE REFERENCES blocks(id) ON DELETE CASCADE
);
"#;

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_blocks_learnplace ON blocks(learnplace_id, sequence);
CREATE INDEX IF NOT EXISTS idx_blocks_accordion ON blocks(accordion_id, sequence);
"#;
