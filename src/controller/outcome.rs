//! What a command hands back to the host: a view to render or a redirect

use serde::Serialize;

use super::form::BlockForm;

/// Message keys the host translates for its flash area
pub const MSG_SAVE_SUCCESS: &str = "message_changes_save_success";
pub const MSG_DELETE_SUCCESS: &str = "message_delete_success";
pub const MSG_ACCESS_DENIED: &str = "common_access_denied";

/// Prefix of the content view anchor pointing at a block position
pub const ANCHOR_PREFIX: &str = "sequence-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "key", rename_all = "lowercase")]
pub enum Flash {
    Success(String),
    Failure(String),
}

impl Flash {
    pub fn key(&self) -> &str {
        match self {
            Flash::Success(key) | Flash::Failure(key) => key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectTarget {
    /// Content view of the current learnplace
    Content,
    /// Root of the host repository
    Repository,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    /// Block form; `saved_query` holds the parameters the form posts back
    EditForm {
        form: BlockForm,
        error: Option<String>,
        saved_query: Vec<(String, String)>,
    },
    ConfirmDelete {
        block_id: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Render(View),
    Redirect {
        target: RedirectTarget,
        anchor: Option<String>,
        flash: Option<Flash>,
    },
}

impl Outcome {
    pub fn to_content() -> Self {
        Outcome::Redirect { target: RedirectTarget::Content, anchor: None, flash: None }
    }

    pub fn access_denied() -> Self {
        Outcome::Redirect {
            target: RedirectTarget::Repository,
            anchor: None,
            flash: Some(Flash::Failure(MSG_ACCESS_DENIED.to_string())),
        }
    }

    /// Success redirect to the content view, optionally anchored at a sequence
    pub fn saved(message: &str, sequence: Option<i32>) -> Self {
        Outcome::Redirect {
            target: RedirectTarget::Content,
            anchor: sequence.map(anchor_for),
            flash: Some(Flash::Success(message.to_string())),
        }
    }

    pub fn failed(message: &str) -> Self {
        Outcome::Redirect {
            target: RedirectTarget::Content,
            anchor: None,
            flash: Some(Flash::Failure(message.to_string())),
        }
    }

    pub fn flash(&self) -> Option<&Flash> {
        match self {
            Outcome::Redirect { flash, .. } => flash.as_ref(),
            Outcome::Render(_) => None,
        }
    }
}

pub fn anchor_for(sequence: i32) -> String {
    format!("{}{}", ANCHOR_PREFIX, sequence)
}
