//! Accordion service - accordion blocks together with their children

use std::sync::Arc;

use tracing::debug;

use crate::db::{blocks, LearnplaceDb};
use crate::error::LearnplaceError;
use crate::model::{Accordion, Entity};

use super::events::{EventBus, LearnplaceEvent};
use super::placement::persist_order;

pub struct AccordionService {
    db: Arc<LearnplaceDb>,
    events: Arc<EventBus>,
}

impl AccordionService {
    pub fn new(db: Arc<LearnplaceDb>, events: Arc<EventBus>) -> Self {
        Self { db, events }
    }

    /// Get accordion with its children
    ///
    /// Fails with `InvalidReference` when `id` names a block of another kind.
    pub fn find(&self, id: i64) -> Result<Accordion, LearnplaceError> {
        self.db.with_conn(|conn| {
            let block = blocks::get_block(conn, id)?
                .ok_or_else(|| LearnplaceError::NotFound(format!("accordion {}", id)))?;
            let accordion = Accordion::new(block, Vec::new())?;
            let children = blocks::list_blocks(conn, accordion.container())?;
            Ok(Accordion { blocks: children, ..accordion })
        })
    }

    /// Write the accordion block and the order of its children
    pub fn store(&self, mut accordion: Accordion) -> Result<Accordion, LearnplaceError> {
        accordion.block.validate()?;
        let created = accordion.is_new();

        let detached = self.db.with_transaction(|tx| {
            if accordion.is_new() {
                accordion.block.id = blocks::insert_block(tx, &accordion.block)?;
            } else if !blocks::update_block(tx, &accordion.block)? {
                return Err(LearnplaceError::NotFound(format!("accordion {}", accordion.block.id)));
            }
            persist_order(tx, &mut accordion)
        })?;

        if created {
            self.events.emit(LearnplaceEvent::BlockCreated {
                id: accordion.id(),
                kind: accordion.block.kind(),
            });
        } else {
            self.events.emit(LearnplaceEvent::BlockUpdated { id: accordion.id() });
        }
        self.events.emit(LearnplaceEvent::SequenceRegenerated {
            container: accordion.container(),
            block_count: accordion.blocks.len(),
            detached,
        });

        debug!(accordion_id = accordion.id(), children = accordion.blocks.len(), detached, "Stored accordion");
        Ok(accordion)
    }
}
