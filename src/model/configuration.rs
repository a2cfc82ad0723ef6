//! Per-object learnplace configuration

use serde::{Deserialize, Serialize};

use super::{Entity, Visibility, UNASSIGNED_ID};
use crate::config::Config;
use crate::error::LearnplaceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub id: i64,
    pub object_id: i64,
    pub online: bool,
    /// Visibility pre-selected for new blocks
    pub default_visibility: Visibility,
    pub map_zoom_level: u8,
    /// Whether visitors may zoom the map
    pub map_zoom: bool,
}

impl Configuration {
    /// Unstored configuration built from the crate defaults
    pub fn defaults_for(object_id: i64, config: &Config) -> Self {
        Self {
            id: UNASSIGNED_ID,
            object_id,
            online: config.default_online,
            default_visibility: config.default_visibility,
            map_zoom_level: config.default_map_zoom_level,
            map_zoom: config.default_map_zoom,
        }
    }

    pub fn validate(&self) -> Result<(), LearnplaceError> {
        if self.object_id <= 0 {
            return Err(LearnplaceError::Validation("object_id is required".into()));
        }
        if !(1..=20).contains(&self.map_zoom_level) {
            return Err(LearnplaceError::Validation(format!(
                "map_zoom_level must be within 1..=20, got {}",
                self.map_zoom_level
            )));
        }
        Ok(())
    }
}

impl Entity for Configuration {
    fn id(&self) -> i64 {
        self.id
    }
}
