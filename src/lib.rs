//! Learnplaces - map-anchored pages built from ordered content blocks
//!
//! A learnplace belongs to one host object and owns an ordered list of blocks
//! (rich text, pictures, videos, maps, links to host objects, accordions).
//! Accordions own an ordered sub-list of their own.
//!
//! ## Architecture
//!
//! ```text
//! CLI / host request handler
//!     ↓
//! BlockController (commands: add, create, edit, update, confirm, delete, cancel)
//!     ↓
//! Services (validation, transactions, events)
//!     ↓
//! Repository (db/*.rs)
//!     ↓
//! SQLite
//! ```
//!
//! ## Block order
//!
//! Every container numbers its blocks `1..=n`. Inserting at a position shifts
//! the following blocks, removing closes the gap. See [`collection`].
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/learnplaces/
//! ├── learnplaces.db      # SQLite database
//! └── config.toml         # Configuration
//! ```

pub mod collection;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod model;
pub mod security;
pub mod services;

// Re-exports
pub use collection::BlockCollection;
pub use config::Config;
pub use controller::{BlockController, Command, Outcome, Request};
pub use db::LearnplaceDb;
pub use error::LearnplaceError;
pub use model::{Accordion, Block, BlockContent, BlockKind, Container, Entity, Learnplace, Location, Visibility};
pub use security::{AccessGuard, Permission, StaticAccessGuard};
pub use services::{EventBus, LearnplaceEvent, Services};
