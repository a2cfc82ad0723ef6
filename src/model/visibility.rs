//! Block visibility

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LearnplaceError;

/// When a block is shown to a visitor of the learnplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    #[default]
    Always,
    Never,
    OnlyAtPlace,
    AfterVisitPlace,
}

impl Visibility {
    pub const ALL: [Visibility; 4] = [
        Visibility::Always,
        Visibility::Never,
        Visibility::OnlyAtPlace,
        Visibility::AfterVisitPlace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Always => "ALWAYS",
            Visibility::Never => "NEVER",
            Visibility::OnlyAtPlace => "ONLY_AT_PLACE",
            Visibility::AfterVisitPlace => "AFTER_VISIT_PLACE",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = LearnplaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Visibility::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                LearnplaceError::Validation(format!(
                    "visibility '{}' is not valid. Valid values: {:?}",
                    s,
                    Visibility::ALL.map(|v| v.as_str())
                ))
            })
    }
}
