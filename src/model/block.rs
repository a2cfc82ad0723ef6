//! Content blocks

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Entity, Visibility, UNASSIGNED_ID};
use crate::error::LearnplaceError;

/// Upper bound for free-text block fields
pub const MAX_TEXT_LEN: usize = 500;

/// Kind of a block, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    RichText,
    Picture,
    Video,
    IliasLink,
    Map,
    Accordion,
}

impl BlockKind {
    pub const ALL: [BlockKind; 6] = [
        BlockKind::RichText,
        BlockKind::Picture,
        BlockKind::Video,
        BlockKind::IliasLink,
        BlockKind::Map,
        BlockKind::Accordion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::RichText => "rich_text",
            BlockKind::Picture => "picture",
            BlockKind::Video => "video",
            BlockKind::IliasLink => "ilias_link",
            BlockKind::Map => "map",
            BlockKind::Accordion => "accordion",
        }
    }

    /// Whether blocks of this kind may live inside an accordion
    pub fn nestable(&self) -> bool {
        !matches!(self, BlockKind::Map | BlockKind::Accordion)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = LearnplaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        BlockKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| LearnplaceError::Validation(format!("unknown block kind '{}'", s)))
    }
}

/// Kind-specific payload of a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockContent {
    RichText {
        content: String,
    },
    Picture {
        title: String,
        #[serde(default)]
        description: String,
        picture_id: i64,
    },
    Video {
        path: String,
        #[serde(default)]
        cover_path: Option<String>,
    },
    /// Link to an object of the host repository
    IliasLink {
        ref_id: i64,
    },
    Map,
    Accordion {
        title: String,
        #[serde(default)]
        expand: bool,
    },
}

impl BlockContent {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockContent::RichText { .. } => BlockKind::RichText,
            BlockContent::Picture { .. } => BlockKind::Picture,
            BlockContent::Video { .. } => BlockKind::Video,
            BlockContent::IliasLink { .. } => BlockKind::IliasLink,
            BlockContent::Map => BlockKind::Map,
            BlockContent::Accordion { .. } => BlockKind::Accordion,
        }
    }

    /// Empty payload of the given kind, used to pre-fill new block forms
    pub fn empty(kind: BlockKind) -> Self {
        match kind {
            BlockKind::RichText => BlockContent::RichText { content: String::new() },
            BlockKind::Picture => BlockContent::Picture {
                title: String::new(),
                description: String::new(),
                picture_id: UNASSIGNED_ID,
            },
            BlockKind::Video => BlockContent::Video { path: String::new(), cover_path: None },
            BlockKind::IliasLink => BlockContent::IliasLink { ref_id: UNASSIGNED_ID },
            BlockKind::Map => BlockContent::Map,
            BlockKind::Accordion => BlockContent::Accordion { title: String::new(), expand: false },
        }
    }

    fn validate(&self) -> Result<(), LearnplaceError> {
        match self {
            BlockContent::RichText { content } => {
                if content.trim().is_empty() {
                    return Err(LearnplaceError::Validation("content is required".into()));
                }
            }
            BlockContent::Picture { title, description, picture_id } => {
                require_text("title", title)?;
                if description.len() > MAX_TEXT_LEN {
                    return Err(LearnplaceError::Validation(format!(
                        "description must be <= {} characters",
                        MAX_TEXT_LEN
                    )));
                }
                if *picture_id <= 0 {
                    return Err(LearnplaceError::Validation("picture is required".into()));
                }
            }
            BlockContent::Video { path, cover_path } => {
                if path.trim().is_empty() {
                    return Err(LearnplaceError::Validation("video path is required".into()));
                }
                if matches!(cover_path, Some(p) if p.trim().is_empty()) {
                    return Err(LearnplaceError::Validation(
                        "cover path must not be blank when given".into(),
                    ));
                }
            }
            BlockContent::IliasLink { ref_id } => {
                if *ref_id <= 0 {
                    return Err(LearnplaceError::Validation("link target is required".into()));
                }
            }
            BlockContent::Map => {}
            BlockContent::Accordion { title, .. } => require_text("title", title)?,
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), LearnplaceError> {
    if value.trim().is_empty() {
        return Err(LearnplaceError::Validation(format!("{} is required", field)));
    }
    if value.len() > MAX_TEXT_LEN {
        return Err(LearnplaceError::Validation(format!(
            "{} must be <= {} characters",
            field, MAX_TEXT_LEN
        )));
    }
    Ok(())
}

/// A unit of content placed in a learnplace or accordion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: i64,
    /// 1-based display position inside the owning container
    #[serde(default)]
    pub sequence: i32,
    #[serde(default)]
    pub visibility: Visibility,
    pub content: BlockContent,
}

impl Block {
    /// New, unstored block
    pub fn new(content: BlockContent) -> Self {
        Self {
            id: UNASSIGNED_ID,
            sequence: 0,
            visibility: Visibility::default(),
            content,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }

    /// Check required fields and payload format
    pub fn validate(&self) -> Result<(), LearnplaceError> {
        if self.id < 0 {
            return Err(LearnplaceError::Validation(format!("invalid block id {}", self.id)));
        }
        self.content.validate()
    }
}

impl Entity for Block {
    fn id(&self) -> i64 {
        self.id
    }
}
