//! Per-object configuration rows

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::LearnplaceError;
use crate::model::Configuration;

#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationRow {
    pub id: i64,
    pub object_id: i64,
    pub online: bool,
    pub default_visibility: String,
    pub map_zoom_level: u8,
    pub map_zoom: bool,
}

impl ConfigurationRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            object_id: row.get("object_id")?,
            online: row.get("online")?,
            default_visibility: row.get("default_visibility")?,
            map_zoom_level: row.get("map_zoom_level")?,
            map_zoom: row.get("map_zoom")?,
        })
    }

    pub fn into_configuration(self) -> Result<Configuration, LearnplaceError> {
        let default_visibility = self.default_visibility.parse().map_err(|_| {
            LearnplaceError::Internal(format!(
                "configuration {} has unknown visibility '{}'",
                self.id, self.default_visibility
            ))
        })?;
        Ok(Configuration {
            id: self.id,
            object_id: self.object_id,
            online: self.online,
            default_visibility,
            map_zoom_level: self.map_zoom_level,
            map_zoom: self.map_zoom,
        })
    }
}

/// Get configuration of a host object
pub fn get_by_object_id(
    conn: &Connection,
    object_id: i64,
) -> Result<Option<ConfigurationRow>, LearnplaceError> {
    conn.query_row(
        "SELECT * FROM configurations WHERE object_id = ?",
        params![object_id],
        ConfigurationRow::from_row,
    )
    .optional()
    .map_err(LearnplaceError::from)
}

/// Insert or replace the configuration of `configuration.object_id`
pub fn upsert(conn: &Connection, configuration: &Configuration) -> Result<ConfigurationRow, LearnplaceError> {
    conn.execute(
        r#"
        INSERT INTO configurations (object_id, online, default_visibility, map_zoom_level, map_zoom)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(object_id) DO UPDATE SET
            online = excluded.online,
            default_visibility = excluded.default_visibility,
            map_zoom_level = excluded.map_zoom_level,
            map_zoom = excluded.map_zoom
        "#,
        params![
            configuration.object_id,
            configuration.online,
            configuration.default_visibility.as_str(),
            configuration.map_zoom_level,
            configuration.map_zoom,
        ],
    )?;

    get_by_object_id(conn, configuration.object_id)?
        .ok_or_else(|| LearnplaceError::Internal("Configuration not found after upsert".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::LearnplaceDb;
    use crate::model::Visibility;

    #[test]
    fn test_upsert_keeps_one_row_per_object() {
        let db = LearnplaceDb::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let mut configuration = Configuration::defaults_for(40, &Config::default());
            let first = upsert(conn, &configuration)?;

            configuration.default_visibility = Visibility::AfterVisitPlace;
            configuration.map_zoom_level = 15;
            let second = upsert(conn, &configuration)?;

            assert_eq!(first.id, second.id);
            let stored = get_by_object_id(conn, 40)?.unwrap().into_configuration()?;
            assert_eq!(stored.default_visibility, Visibility::AfterVisitPlace);
            assert_eq!(stored.map_zoom_level, 15);
            Ok(())
        })
        .unwrap();
    }
}
