//! Error types for learnplaces

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LearnplaceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LearnplaceError {
    /// Message key shown to the user when this error ends a request
    pub fn flash_key(&self) -> &'static str {
        match self {
            LearnplaceError::Validation(_) => "message_validation_failed",
            LearnplaceError::NotFound(_) | LearnplaceError::InvalidReference(_) => {
                "message_invalid_reference"
            }
            LearnplaceError::AccessDenied(_) => "common_access_denied",
            LearnplaceError::Conflict(_) => "message_conflict",
            _ => "message_internal_error",
        }
    }

    /// Whether the submitted form should be shown again
    pub fn is_validation(&self) -> bool {
        matches!(self, LearnplaceError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_keys() {
        assert_eq!(
            LearnplaceError::NotFound("block 3".into()).flash_key(),
            "message_invalid_reference"
        );
        assert_eq!(
            LearnplaceError::InvalidReference("accordion 9".into()).flash_key(),
            "message_invalid_reference"
        );
        assert_eq!(
            LearnplaceError::AccessDenied("write".into()).flash_key(),
            "common_access_denied"
        );
        assert!(LearnplaceError::Validation("title".into()).is_validation());
        assert!(!LearnplaceError::Internal("x".into()).is_validation());
    }
}
