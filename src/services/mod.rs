//! Service layer for learnplaces
//!
//! Services encapsulate business logic between the block controller and the
//! repositories. Each service wraps database operations with:
//! - Input validation
//! - Transaction boundaries around container stores
//! - Event emission for audit/notifications
//!
//! ## Architecture
//!
//! ```text
//! BlockController / CLI
//!     ↓
//! Service Layer (business logic)
//!     ↓
//! Repository Layer (db/*.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod accordion_service;
pub mod block_service;
pub mod configuration_service;
pub mod events;
pub mod learnplace_service;
mod placement;

// Re-exports
pub use accordion_service::AccordionService;
pub use block_service::BlockService;
pub use configuration_service::ConfigurationService;
pub use events::{EventBus, EventListener, LearnplaceEvent};
pub use learnplace_service::LearnplaceService;

use std::sync::Arc;

use crate::config::Config;
use crate::db::{DbStats, LearnplaceDb};
use crate::error::LearnplaceError;
use crate::model::Container;

/// Service container for dependency injection
///
/// Holds all services with a shared database connection and event bus.
pub struct Services {
    pub block: Arc<BlockService>,
    pub learnplace: Arc<LearnplaceService>,
    pub accordion: Arc<AccordionService>,
    pub configuration: Arc<ConfigurationService>,
    pub events: Arc<EventBus>,
    db: Arc<LearnplaceDb>,
}

impl Services {
    /// Create all services with shared database
    pub fn new(db: Arc<LearnplaceDb>, config: &Config) -> Self {
        let events = Arc::new(EventBus::new());

        Self {
            block: Arc::new(BlockService::new(db.clone(), events.clone())),
            learnplace: Arc::new(LearnplaceService::new(db.clone(), events.clone())),
            accordion: Arc::new(AccordionService::new(db.clone(), events.clone())),
            configuration: Arc::new(ConfigurationService::new(
                db.clone(),
                events.clone(),
                config.clone(),
            )),
            events,
            db,
        }
    }

    /// Renumber the blocks left in `container` after a removal
    pub fn regenerate_container(&self, container: Container) -> Result<(), LearnplaceError> {
        match container {
            Container::Learnplace(id) => {
                let learnplace = self.learnplace.find(id)?;
                self.learnplace.store(learnplace)?;
            }
            Container::Accordion(id) => {
                let accordion = self.accordion.find(id)?;
                self.accordion.store(accordion)?;
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> Result<DbStats, LearnplaceError> {
        self.db.stats()
    }
}
