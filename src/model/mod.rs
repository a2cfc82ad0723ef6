//! Domain model: learnplaces, accordions, blocks and per-object configuration
//!
//! Every persisted type implements [`Entity`]. An id of `0` marks an entity
//! that has not been stored yet; storing assigns the real id.

pub mod block;
pub mod configuration;
pub mod learnplace;
pub mod visibility;

pub use block::{Block, BlockContent, BlockKind};
pub use configuration::Configuration;
pub use learnplace::{Accordion, Container, Learnplace, Location};
pub use visibility::Visibility;

/// Id value of an entity that was never stored
pub const UNASSIGNED_ID: i64 = 0;

/// A persisted entity with an integer id
pub trait Entity {
    fn id(&self) -> i64;

    /// True until the entity has been stored once
    fn is_new(&self) -> bool {
        self.id() == UNASSIGNED_ID
    }
}
