//! Learnplaces, accordions and their location

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Block, BlockContent, Entity, UNASSIGNED_ID};
use crate::error::LearnplaceError;

/// Geographic anchor of a learnplace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
    /// Radius in meters around the coordinates that counts as "at the place"
    pub radius: u32,
}

impl Location {
    pub fn validate(&self) -> Result<(), LearnplaceError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(LearnplaceError::Validation(format!(
                "latitude {} is outside -90..=90",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(LearnplaceError::Validation(format!(
                "longitude {} is outside -180..=180",
                self.longitude
            )));
        }
        if !self.elevation.is_finite() {
            return Err(LearnplaceError::Validation("elevation must be finite".into()));
        }
        if self.radius == 0 {
            return Err(LearnplaceError::Validation("radius must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Identifies the owner of an ordered block list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Container {
    Learnplace(i64),
    Accordion(i64),
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Learnplace(id) => write!(f, "learnplace:{}", id),
            Container::Accordion(id) => write!(f, "accordion:{}", id),
        }
    }
}

/// A map-anchored page built from an ordered list of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learnplace {
    #[serde(default)]
    pub id: i64,
    /// Host object this learnplace belongs to
    pub object_id: i64,
    pub location: Location,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Learnplace {
    pub fn new(object_id: i64, location: Location) -> Self {
        Self {
            id: UNASSIGNED_ID,
            object_id,
            location,
            blocks: Vec::new(),
        }
    }

    pub fn container(&self) -> Container {
        Container::Learnplace(self.id)
    }
}

impl Entity for Learnplace {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Accordion block together with its child blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accordion {
    pub block: Block,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Accordion {
    /// Wrap an accordion block; fails for any other kind
    pub fn new(block: Block, blocks: Vec<Block>) -> Result<Self, LearnplaceError> {
        if !matches!(block.content, BlockContent::Accordion { .. }) {
            return Err(LearnplaceError::InvalidReference(format!(
                "block {} is a {} block, not an accordion",
                block.id,
                block.kind()
            )));
        }
        Ok(Self { block, blocks })
    }

    pub fn title(&self) -> &str {
        match &self.block.content {
            BlockContent::Accordion { title, .. } => title,
            _ => "",
        }
    }

    pub fn sequence(&self) -> i32 {
        self.block.sequence
    }

    pub fn container(&self) -> Container {
        Container::Accordion(self.block.id)
    }
}

impl Entity for Accordion {
    fn id(&self) -> i64 {
        self.block.id
    }
}
