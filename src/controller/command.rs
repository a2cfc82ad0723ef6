//! Block commands

use std::fmt;
use std::str::FromStr;

use crate::error::LearnplaceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Index,
    Add,
    Cancel,
    Confirm,
    Create,
    Delete,
    Edit,
    Update,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::Index,
        Command::Add,
        Command::Cancel,
        Command::Confirm,
        Command::Create,
        Command::Delete,
        Command::Edit,
        Command::Update,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Index => "index",
            Command::Add => "add",
            Command::Cancel => "cancel",
            Command::Confirm => "confirm",
            Command::Create => "create",
            Command::Delete => "delete",
            Command::Edit => "edit",
            Command::Update => "update",
        }
    }

    /// Commands that need write permission on the learnplace
    pub fn requires_write(&self) -> bool {
        !matches!(self, Command::Index)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = LearnplaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| LearnplaceError::Validation(format!("unknown command '{}'", s)))
    }
}
