//! Block CRUD and container placement
//!
//! Payloads are stored as JSON in `payload_json`, except for link blocks whose
//! target lives in `ilias_link_blocks`.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use super::ilias_links;
use crate::error::LearnplaceError;
use crate::model::{Block, BlockContent, BlockKind, Container, Visibility};

/// Block row from database
#[derive(Debug, Clone, Serialize)]
pub struct BlockRow {
    pub id: i64,
    pub kind: String,
    pub sequence: i32,
    pub visibility: String,
    pub payload_json: Option<String>,
    pub learnplace_id: Option<i64>,
    pub accordion_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl BlockRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            kind: row.get("kind")?,
            sequence: row.get("sequence")?,
            visibility: row.get("visibility")?,
            payload_json: row.get("payload_json")?,
            learnplace_id: row.get("learnplace_id")?,
            accordion_id: row.get("accordion_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Container the block is placed in, if any
    pub fn container(&self) -> Option<Container> {
        match (self.learnplace_id, self.accordion_id) {
            (Some(id), _) => Some(Container::Learnplace(id)),
            (None, Some(id)) => Some(Container::Accordion(id)),
            (None, None) => None,
        }
    }

    /// Build the domain block, reading the link row for link blocks
    pub fn into_block(self, conn: &Connection) -> Result<Block, LearnplaceError> {
        let kind: BlockKind = self
            .kind
            .parse()
            .map_err(|_| LearnplaceError::Internal(format!("block {} has unknown kind '{}'", self.id, self.kind)))?;
        let visibility: Visibility = self.visibility.parse().map_err(|_| {
            LearnplaceError::Internal(format!(
                "block {} has unknown visibility '{}'",
                self.id, self.visibility
            ))
        })?;

        let content = if kind == BlockKind::IliasLink {
            let link = ilias_links::find_by_block(conn, self.id)?.ok_or_else(|| {
                LearnplaceError::Internal(format!("link block {} has no link row", self.id))
            })?;
            BlockContent::IliasLink { ref_id: link.ref_id }
        } else {
            let payload = self.payload_json.as_deref().ok_or_else(|| {
                LearnplaceError::Internal(format!("block {} has no payload", self.id))
            })?;
            serde_json::from_str(payload)?
        };

        Ok(Block {
            id: self.id,
            sequence: self.sequence,
            visibility,
            content,
        })
    }
}

fn payload_for(content: &BlockContent) -> Result<Option<String>, LearnplaceError> {
    match content {
        BlockContent::IliasLink { .. } => Ok(None),
        other => Ok(Some(serde_json::to_string(other)?)),
    }
}

/// Get the raw row of a block
pub fn get_block_row(conn: &Connection, id: i64) -> Result<Option<BlockRow>, LearnplaceError> {
    conn.query_row("SELECT * FROM blocks WHERE id = ?", params![id], BlockRow::from_row)
        .optional()
        .map_err(LearnplaceError::from)
}

/// Get block by id
pub fn get_block(conn: &Connection, id: i64) -> Result<Option<Block>, LearnplaceError> {
    match get_block_row(conn, id)? {
        Some(row) => Ok(Some(row.into_block(conn)?)),
        None => Ok(None),
    }
}

/// Container of a block; `None` when the block is missing or unplaced
pub fn container_of(conn: &Connection, id: i64) -> Result<Option<Container>, LearnplaceError> {
    Ok(get_block_row(conn, id)?.and_then(|row| row.container()))
}

/// Insert a new block (not yet placed), returning its id
pub fn insert_block(conn: &Connection, block: &Block) -> Result<i64, LearnplaceError> {
    conn.execute(
        "INSERT INTO blocks (kind, sequence, visibility, payload_json) VALUES (?, ?, ?, ?)",
        params![
            block.kind().as_str(),
            block.sequence,
            block.visibility.as_str(),
            payload_for(&block.content)?,
        ],
    )?;
    let id = conn.last_insert_rowid();

    if let BlockContent::IliasLink { ref_id } = block.content {
        ilias_links::insert(conn, ref_id, Some(id))?;
    }

    debug!(block_id = id, kind = %block.kind(), "Inserted block");
    Ok(id)
}

/// Update kind, visibility, sequence and payload of an existing block
pub fn update_block(conn: &Connection, block: &Block) -> Result<bool, LearnplaceError> {
    let changes = conn.execute(
        r#"
        UPDATE blocks
        SET kind = ?, sequence = ?, visibility = ?, payload_json = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
        params![
            block.kind().as_str(),
            block.sequence,
            block.visibility.as_str(),
            payload_for(&block.content)?,
            block.id,
        ],
    )?;
    if changes == 0 {
        return Ok(false);
    }

    match block.content {
        BlockContent::IliasLink { ref_id } => {
            ilias_links::upsert_for_block(conn, block.id, ref_id)?;
        }
        _ => {
            ilias_links::delete_by_block(conn, block.id)?;
        }
    }
    Ok(true)
}

/// Delete block; accordion children and the link row go with it
pub fn delete_block(conn: &Connection, id: i64) -> Result<bool, LearnplaceError> {
    let changes = conn.execute("DELETE FROM blocks WHERE id = ?", params![id])?;
    Ok(changes > 0)
}

/// Blocks of a container in sequence order
pub fn list_blocks(conn: &Connection, container: Container) -> Result<Vec<Block>, LearnplaceError> {
    let (sql, id) = match container {
        Container::Learnplace(id) => (
            "SELECT * FROM blocks WHERE learnplace_id = ? ORDER BY sequence, id",
            id,
        ),
        Container::Accordion(id) => (
            "SELECT * FROM blocks WHERE accordion_id = ? ORDER BY sequence, id",
            id,
        ),
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![id], BlockRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(|row| row.into_block(conn)).collect()
}

/// Place a block into a container at `sequence`, leaving any previous container
pub fn attach_block(
    conn: &Connection,
    block_id: i64,
    container: Container,
    sequence: i32,
) -> Result<bool, LearnplaceError> {
    let (learnplace_id, accordion_id) = match container {
        Container::Learnplace(id) => (Some(id), None),
        Container::Accordion(id) => (None, Some(id)),
    };
    let changes = conn.execute(
        r#"
        UPDATE blocks
        SET learnplace_id = ?, accordion_id = ?, sequence = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
        params![learnplace_id, accordion_id, sequence, block_id],
    )?;
    Ok(changes > 0)
}

/// Take every block of `container` that is not in `keep` out of the container
pub fn detach_others(
    conn: &Connection,
    container: Container,
    keep: &[i64],
) -> Result<usize, LearnplaceError> {
    let (column, id) = match container {
        Container::Learnplace(id) => ("learnplace_id", id),
        Container::Accordion(id) => ("accordion_id", id),
    };

    let mut stmt = conn.prepare(&format!("SELECT id FROM blocks WHERE {} = ?", column))?;
    let current: Vec<i64> = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut detached = 0;
    for block_id in current.into_iter().filter(|b| !keep.contains(b)) {
        detached += conn.execute(
            &format!(
                "UPDATE blocks SET {} = NULL, sequence = 0, updated_at = datetime('now') WHERE id = ?",
                column
            ),
            params![block_id],
        )?;
    }
    Ok(detached)
}
