//! Link block association rows
//!
//! A link block keeps its target (a host reference id) in a separate row that
//! points back at the block. `fk_block_id` is unique: one row per block.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::map_unique_violation;
use crate::error::LearnplaceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IliasLinkBlockRow {
    pub pk_id: i64,
    /// Host reference id the link points to
    pub ref_id: i64,
    pub fk_block_id: Option<i64>,
}

impl IliasLinkBlockRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            pk_id: row.get("pk_id")?,
            ref_id: row.get("ref_id")?,
            fk_block_id: row.get("fk_block_id")?,
        })
    }
}

/// Get a row by primary key
pub fn get(conn: &Connection, pk_id: i64) -> Result<Option<IliasLinkBlockRow>, LearnplaceError> {
    conn.query_row(
        "SELECT * FROM ilias_link_blocks WHERE pk_id = ?",
        params![pk_id],
        IliasLinkBlockRow::from_row,
    )
    .optional()
    .map_err(LearnplaceError::from)
}

/// Get the row belonging to a block
pub fn find_by_block(
    conn: &Connection,
    block_id: i64,
) -> Result<Option<IliasLinkBlockRow>, LearnplaceError> {
    conn.query_row(
        "SELECT * FROM ilias_link_blocks WHERE fk_block_id = ?",
        params![block_id],
        IliasLinkBlockRow::from_row,
    )
    .optional()
    .map_err(LearnplaceError::from)
}

/// Insert a new row; a second row for the same block is a `Conflict`
pub fn insert(
    conn: &Connection,
    ref_id: i64,
    fk_block_id: Option<i64>,
) -> Result<IliasLinkBlockRow, LearnplaceError> {
    conn.execute(
        "INSERT INTO ilias_link_blocks (ref_id, fk_block_id) VALUES (?, ?)",
        params![ref_id, fk_block_id],
    )
    .map_err(|e| {
        map_unique_violation(
            e,
            &format!("block {:?} already has a link row", fk_block_id),
        )
    })?;

    Ok(IliasLinkBlockRow {
        pk_id: conn.last_insert_rowid(),
        ref_id,
        fk_block_id,
    })
}

/// Point the row of `block_id` at `ref_id`, creating the row if missing
pub fn upsert_for_block(
    conn: &Connection,
    block_id: i64,
    ref_id: i64,
) -> Result<IliasLinkBlockRow, LearnplaceError> {
    match find_by_block(conn, block_id)? {
        Some(mut row) => {
            conn.execute(
                "UPDATE ilias_link_blocks SET ref_id = ? WHERE pk_id = ?",
                params![ref_id, row.pk_id],
            )?;
            row.ref_id = ref_id;
            Ok(row)
        }
        None => insert(conn, ref_id, Some(block_id)),
    }
}

/// Delete the row of a block
pub fn delete_by_block(conn: &Connection, block_id: i64) -> Result<bool, LearnplaceError> {
    let changes = conn.execute(
        "DELETE FROM ilias_link_blocks WHERE fk_block_id = ?",
        params![block_id],
    )?;
    Ok(changes > 0)
}
