//! Learnplace CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::map_unique_violation;
use crate::error::LearnplaceError;
use crate::model::{Learnplace, Location};

/// Learnplace row from database
#[derive(Debug, Clone, Serialize)]
pub struct LearnplaceRow {
    pub id: i64,
    pub object_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub radius: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl LearnplaceRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            object_id: row.get("object_id")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            elevation: row.get("elevation")?,
            radius: row.get("radius")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn location(&self) -> Location {
        Location {
            latitude: self.latitude,
            longitude: self.longitude,
            elevation: self.elevation,
            radius: self.radius,
        }
    }

    /// Domain value without blocks
    pub fn into_learnplace(self) -> Learnplace {
        Learnplace {
            id: self.id,
            object_id: self.object_id,
            location: self.location(),
            blocks: Vec::new(),
        }
    }
}

/// Get learnplace by id
pub fn get_learnplace(conn: &Connection, id: i64) -> Result<Option<LearnplaceRow>, LearnplaceError> {
    conn.query_row(
        "SELECT * FROM learnplaces WHERE id = ?",
        params![id],
        LearnplaceRow::from_row,
    )
    .optional()
    .map_err(LearnplaceError::from)
}

/// Get learnplace by host object id
pub fn get_by_object_id(
    conn: &Connection,
    object_id: i64,
) -> Result<Option<LearnplaceRow>, LearnplaceError> {
    conn.query_row(
        "SELECT * FROM learnplaces WHERE object_id = ?",
        params![object_id],
        LearnplaceRow::from_row,
    )
    .optional()
    .map_err(LearnplaceError::from)
}

/// List learnplaces ordered by object id
pub fn list_learnplaces(
    conn: &Connection,
    limit: u32,
    offset: u32,
) -> Result<Vec<LearnplaceRow>, LearnplaceError> {
    let mut stmt = conn.prepare("SELECT * FROM learnplaces ORDER BY object_id LIMIT ? OFFSET ?")?;
    let rows = stmt
        .query_map(params![limit as i64, offset as i64], LearnplaceRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Create a learnplace; one learnplace per object
pub fn create_learnplace(
    conn: &Connection,
    object_id: i64,
    location: &Location,
) -> Result<LearnplaceRow, LearnplaceError> {
    conn.execute(
        r#"
        INSERT INTO learnplaces (object_id, latitude, longitude, elevation, radius)
        VALUES (?, ?, ?, ?, ?)
        "#,
        params![
            object_id,
            location.latitude,
            location.longitude,
            location.elevation,
            location.radius,
        ],
    )
    .map_err(|e| {
        map_unique_violation(e, &format!("object {} already has a learnplace", object_id))
    })?;

    let id = conn.last_insert_rowid();
    get_learnplace(conn, id)?
        .ok_or_else(|| LearnplaceError::Internal("Learnplace not found after insert".to_string()))
}

/// Update the location of a learnplace
pub fn update_location(
    conn: &Connection,
    id: i64,
    location: &Location,
) -> Result<bool, LearnplaceError> {
    let changes = conn.execute(
        r#"
        UPDATE learnplaces
        SET latitude = ?, longitude = ?, elevation = ?, radius = ?, updated_at = datetime('now')
        WHERE id = ?
        "#,
        params![
            location.latitude,
            location.longitude,
            location.elevation,
            location.radius,
            id,
        ],
    )?;
    Ok(changes > 0)
}

/// Delete learnplace; its blocks go with it
pub fn delete_learnplace(conn: &Connection, id: i64) -> Result<bool, LearnplaceError> {
    let changes = conn.execute("DELETE FROM learnplaces WHERE id = ?", params![id])?;
    Ok(changes > 0)
}
