//! Block edit forms
//!
//! A form is the flat field map a host renders and posts back. Parsing a
//! posted form into a [`Block`] is where `Validation` errors originate; on
//! failure the controller hands the same form back so the user keeps their
//! input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LearnplaceError;
use crate::model::{Block, BlockContent, BlockKind, Visibility};

pub const FIELD_BLOCK_ID: &str = "block_id";
pub const FIELD_VISIBILITY: &str = "visibility";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_PICTURE_ID: &str = "picture_id";
pub const FIELD_PATH: &str = "path";
pub const FIELD_COVER_PATH: &str = "cover_path";
pub const FIELD_REF_ID: &str = "ref_id";
pub const FIELD_EXPAND: &str = "expand";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockForm {
    pub kind: BlockKind,
    pub values: BTreeMap<String, String>,
}

impl BlockForm {
    pub fn new(kind: BlockKind) -> Self {
        Self { kind, values: BTreeMap::new() }
    }

    /// Form pre-filled from an existing or template block
    pub fn from_block(block: &Block) -> Self {
        let mut form = Self::new(block.kind())
            .with(FIELD_BLOCK_ID, block.id.to_string())
            .with(FIELD_VISIBILITY, block.visibility.as_str());

        form = match &block.content {
            BlockContent::RichText { content } => form.with(FIELD_CONTENT, content.as_str()),
            BlockContent::Picture { title, description, picture_id } => form
                .with(FIELD_TITLE, title.as_str())
                .with(FIELD_DESCRIPTION, description.as_str())
                .with(FIELD_PICTURE_ID, picture_id.to_string()),
            BlockContent::Video { path, cover_path } => form
                .with(FIELD_PATH, path.as_str())
                .with(FIELD_COVER_PATH, cover_path.clone().unwrap_or_default()),
            BlockContent::IliasLink { ref_id } => form.with(FIELD_REF_ID, ref_id.to_string()),
            BlockContent::Map => form,
            BlockContent::Accordion { title, expand } => form
                .with(FIELD_TITLE, title.as_str())
                .with(FIELD_EXPAND, expand.to_string()),
        };
        form
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Parse the posted values into a validated block
    pub fn to_block(&self) -> Result<Block, LearnplaceError> {
        let id = match self.get(FIELD_BLOCK_ID).map(str::trim) {
            None | Some("") => 0,
            Some(raw) => parse_id(FIELD_BLOCK_ID, raw)?,
        };
        let visibility: Visibility = self
            .get(FIELD_VISIBILITY)
            .ok_or_else(|| LearnplaceError::Validation("visibility is required".into()))?
            .parse()?;

        let content = match self.kind {
            BlockKind::RichText => BlockContent::RichText { content: self.text(FIELD_CONTENT) },
            BlockKind::Picture => BlockContent::Picture {
                title: self.text(FIELD_TITLE),
                description: self.text(FIELD_DESCRIPTION),
                picture_id: self.number(FIELD_PICTURE_ID)?,
            },
            BlockKind::Video => BlockContent::Video {
                path: self.text(FIELD_PATH),
                cover_path: self
                    .get(FIELD_COVER_PATH)
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            },
            BlockKind::IliasLink => BlockContent::IliasLink { ref_id: self.number(FIELD_REF_ID)? },
            BlockKind::Map => BlockContent::Map,
            BlockKind::Accordion => BlockContent::Accordion {
                title: self.text(FIELD_TITLE),
                expand: matches!(
                    self.get(FIELD_EXPAND).map(str::trim),
                    Some("1" | "true" | "on" | "yes")
                ),
            },
        };

        let block = Block { id, sequence: 0, visibility, content };
        block.validate()?;
        Ok(block)
    }

    fn text(&self, field: &str) -> String {
        self.get(field).unwrap_or_default().to_string()
    }

    fn number(&self, field: &str) -> Result<i64, LearnplaceError> {
        match self.get(field).map(str::trim) {
            None | Some("") => Ok(0),
            Some(raw) => parse_id(field, raw),
        }
    }
}

fn parse_id(field: &str, raw: &str) -> Result<i64, LearnplaceError> {
    raw.parse()
        .map_err(|_| LearnplaceError::Validation(format!("{} must be a number, got '{}'", field, raw)))
}
