//! Access checks delegated to the host platform
//!
//! The crate never decides on its own who may edit a learnplace. The host
//! supplies an [`AccessGuard`]; the block controller asks it for
//! [`Permission::Read`] before `index` and [`Permission::Write`] before any
//! other command.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Permissions on a host object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Read => write!(f, "read"),
            Permission::Write => write!(f, "write"),
        }
    }
}

/// Host access control
pub trait AccessGuard: Send + Sync {
    /// Whether the current user holds `permission` on the object at `ref_id`
    fn has_permission(&self, permission: Permission, ref_id: i64) -> bool;
}

/// Guard answering from a fixed table, with a fallback for unknown ref ids
///
/// Used by the CLI (which runs as the instance operator) and by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAccessGuard {
    granted: HashMap<i64, Permission>,
    fallback: Option<Permission>,
}

impl StaticAccessGuard {
    /// Guard that grants `Write` on every object
    pub fn allow_all() -> Self {
        Self { granted: HashMap::new(), fallback: Some(Permission::Write) }
    }

    /// Guard that denies everything
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Grant `permission` (and every lower one) on `ref_id`
    pub fn grant(mut self, ref_id: i64, permission: Permission) -> Self {
        self.granted.insert(ref_id, permission);
        self
    }
}

impl AccessGuard for StaticAccessGuard {
    fn has_permission(&self, permission: Permission, ref_id: i64) -> bool {
        match self.granted.get(&ref_id).copied().or(self.fallback) {
            Some(held) => held >= permission,
            None => false,
        }
    }
}
