//! Block service - find, store and delete single blocks
//!
//! Storing a block never changes where it is placed; placement is written by
//! the learnplace and accordion services.

use std::sync::Arc;

use tracing::debug;

use crate::db::{blocks, LearnplaceDb};
use crate::error::LearnplaceError;
use crate::model::{Block, Container, Entity};

use super::events::{EventBus, LearnplaceEvent};

pub struct BlockService {
    db: Arc<LearnplaceDb>,
    events: Arc<EventBus>,
}

impl BlockService {
    pub fn new(db: Arc<LearnplaceDb>, events: Arc<EventBus>) -> Self {
        Self { db, events }
    }

    /// Get block by id
    pub fn find(&self, id: i64) -> Result<Block, LearnplaceError> {
        self.db
            .with_conn(|conn| blocks::get_block(conn, id))?
            .ok_or_else(|| LearnplaceError::NotFound(format!("block {}", id)))
    }

    /// Container the block is placed in
    pub fn container_of(&self, id: i64) -> Result<Option<Container>, LearnplaceError> {
        self.db.with_conn(|conn| blocks::container_of(conn, id))
    }

    /// Insert a new block (id 0) or update an existing one
    pub fn store(&self, mut block: Block) -> Result<Block, LearnplaceError> {
        block.validate()?;

        if block.is_new() {
            block.id = self.db.with_transaction(|tx| blocks::insert_block(tx, &block))?;
            self.events.emit(LearnplaceEvent::BlockCreated {
                id: block.id,
                kind: block.kind(),
            });
        } else {
            let updated = self.db.with_transaction(|tx| blocks::update_block(tx, &block))?;
            if !updated {
                return Err(LearnplaceError::NotFound(format!("block {}", block.id)));
            }
            self.events.emit(LearnplaceEvent::BlockUpdated { id: block.id });
        }

        debug!(block_id = block.id, kind = %block.kind(), "Stored block");
        Ok(block)
    }

    /// Delete a block; accordion children are deleted with it
    pub fn delete(&self, id: i64) -> Result<(), LearnplaceError> {
        let container = self.db.with_transaction(|tx| {
            let row = blocks::get_block_row(tx, id)?
                .ok_or_else(|| LearnplaceError::NotFound(format!("block {}", id)))?;
            blocks::delete_block(tx, id)?;
            Ok(row.container())
        })?;

        self.events.emit(LearnplaceEvent::BlockDeleted { id, container });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockContent, Visibility};

    fn service() -> BlockService {
        let db = Arc::new(LearnplaceDb::open_in_memory().unwrap());
        BlockService::new(db, Arc::new(EventBus::new()))
    }

    #[test]
    fn test_store_assigns_id_then_updates() {
        let service = service();
        let block = Block::new(BlockContent::Video {
            path: "videos/bridge.mp4".into(),
            cover_path: None,
        });

        let mut stored = service.store(block).unwrap();
        assert!(stored.id > 0);

        stored.visibility = Visibility::Never;
        service.store(stored.clone()).unwrap();
        assert_eq!(service.find(stored.id).unwrap().visibility, Visibility::Never);
    }

    #[test]
    fn test_store_rejects_invalid_block() {
        let service = service();
        let err = service
            .store(Block::new(BlockContent::IliasLink { ref_id: -1 }))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_update_of_unknown_block_is_not_found() {
        let service = service();
        let mut block = Block::new(BlockContent::Map);
        block.id = 404;
        assert!(matches!(service.store(block), Err(LearnplaceError::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let service = service();
        let mut receiver = service.events.subscribe();
        let stored = service.store(Block::new(BlockContent::Map)).unwrap();

        service.delete(stored.id).unwrap();
        assert!(matches!(service.find(stored.id), Err(LearnplaceError::NotFound(_))));
        assert!(matches!(service.delete(stored.id), Err(LearnplaceError::NotFound(_))));

        let events = crate::services::events::drain(&mut receiver);
        assert_eq!(
            events.last(),
            Some(&LearnplaceEvent::BlockDeleted { id: stored.id, container: None })
        );
    }
}
