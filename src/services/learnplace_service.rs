//! Learnplace service - business logic for learnplaces and their block order
//!
//! `store` is the only place where the top-level block order of a learnplace
//! is written. Deleting a block and storing the re-read learnplace afterwards
//! regenerates the remaining sequence.

use std::sync::Arc;

use tracing::{debug, info};

use crate::db::{blocks, learnplaces, LearnplaceDb};
use crate::error::LearnplaceError;
use crate::model::{BlockKind, Container, Entity, Learnplace, Location};

use super::events::{EventBus, LearnplaceEvent};
use super::placement::persist_order;

pub struct LearnplaceService {
    db: Arc<LearnplaceDb>,
    events: Arc<EventBus>,
}

impl LearnplaceService {
    pub fn new(db: Arc<LearnplaceDb>, events: Arc<EventBus>) -> Self {
        Self { db, events }
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Get learnplace with its top-level blocks
    pub fn find(&self, id: i64) -> Result<Learnplace, LearnplaceError> {
        self.db.with_conn(|conn| {
            let row = learnplaces::get_learnplace(conn, id)?
                .ok_or_else(|| LearnplaceError::NotFound(format!("learnplace {}", id)))?;
            let mut learnplace = row.into_learnplace();
            learnplace.blocks = blocks::list_blocks(conn, Container::Learnplace(id))?;
            Ok(learnplace)
        })
    }

    /// Get the learnplace of a host object
    pub fn find_by_object_id(&self, object_id: i64) -> Result<Learnplace, LearnplaceError> {
        self.db.with_conn(|conn| {
            let row = learnplaces::get_by_object_id(conn, object_id)?.ok_or_else(|| {
                LearnplaceError::NotFound(format!("learnplace of object {}", object_id))
            })?;
            let mut learnplace = row.into_learnplace();
            learnplace.blocks = blocks::list_blocks(conn, Container::Learnplace(learnplace.id))?;
            Ok(learnplace)
        })
    }

    /// List learnplaces without their blocks
    pub fn list(&self, limit: u32, offset: u32) -> Result<Vec<Learnplace>, LearnplaceError> {
        let rows = self.db.with_conn(|conn| learnplaces::list_learnplaces(conn, limit, offset))?;
        Ok(rows.into_iter().map(|row| row.into_learnplace()).collect())
    }

    /// Whether the learnplace of `object_id` contains a map block
    pub fn has_map(&self, object_id: i64) -> Result<bool, LearnplaceError> {
        match self.find_by_object_id(object_id) {
            Ok(learnplace) => Ok(learnplace.blocks.iter().any(|b| b.kind() == BlockKind::Map)),
            Err(LearnplaceError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Create an empty learnplace for a host object
    pub fn create(&self, object_id: i64, location: Location) -> Result<Learnplace, LearnplaceError> {
        if object_id <= 0 {
            return Err(LearnplaceError::Validation("object_id is required".into()));
        }
        location.validate()?;

        let row = self
            .db
            .with_conn(|conn| learnplaces::create_learnplace(conn, object_id, &location))?;

        info!(id = row.id, object_id, "Created learnplace");
        self.events.emit(LearnplaceEvent::LearnplaceCreated { id: row.id, object_id });
        Ok(row.into_learnplace())
    }

    /// Write location and block order; returns the learnplace with ids and sequences set
    pub fn store(&self, mut learnplace: Learnplace) -> Result<Learnplace, LearnplaceError> {
        if learnplace.is_new() {
            return Err(LearnplaceError::Validation(
                "learnplace must be created before it is stored".into(),
            ));
        }
        learnplace.location.validate()?;

        let detached = self.db.with_transaction(|tx| {
            if !learnplaces::update_location(tx, learnplace.id, &learnplace.location)? {
                return Err(LearnplaceError::NotFound(format!("learnplace {}", learnplace.id)));
            }
            persist_order(tx, &mut learnplace)
        })?;

        debug!(
            id = learnplace.id,
            blocks = learnplace.blocks.len(),
            detached,
            "Stored learnplace"
        );
        self.events.emit(LearnplaceEvent::SequenceRegenerated {
            container: learnplace.container(),
            block_count: learnplace.blocks.len(),
            detached,
        });
        Ok(learnplace)
    }

    /// Delete learnplace and all of its blocks
    pub fn delete(&self, id: i64) -> Result<(), LearnplaceError> {
        let deleted = self.db.with_conn(|conn| learnplaces::delete_learnplace(conn, id))?;
        if !deleted {
            return Err(LearnplaceError::NotFound(format!("learnplace {}", id)));
        }

        info!(id, "Deleted learnplace");
        self.events.emit(LearnplaceEvent::LearnplaceDeleted { id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::BlockCollection;
    use crate::model::{Block, BlockContent};

    fn service() -> LearnplaceService {
        let db = Arc::new(LearnplaceDb::open_in_memory().unwrap());
        LearnplaceService::new(db, Arc::new(EventBus::new()))
    }

    fn location() -> Location {
        Location { latitude: 46.2, longitude: 6.15, elevation: 375.0, radius: 30 }
    }

    fn text(content: &str) -> Block {
        Block::new(BlockContent::RichText { content: content.into() })
    }

    #[test]
    fn test_create_and_find() {
        let service = service();
        let created = service.create(11, location()).unwrap();

        let found = service.find_by_object_id(11).unwrap();
        assert_eq!(found.id, created.id);
        assert!(found.blocks.is_empty());
        assert!(matches!(service.find(created.id + 1), Err(LearnplaceError::NotFound(_))));
    }

    #[test]
    fn test_create_validates_location() {
        let service = service();
        let bad = Location { latitude: 120.0, ..location() };
        assert!(service.create(11, bad).unwrap_err().is_validation());
    }

    #[test]
    fn test_store_writes_order() {
        let service = service();
        let mut learnplace = service.create(11, location()).unwrap();
        learnplace.push(text("first")).unwrap();
        learnplace.push(text("second")).unwrap();
        learnplace.insert(text("zeroth"), 0).unwrap();

        let stored = service.store(learnplace).unwrap();
        assert!(stored.blocks.iter().all(|b| b.id > 0));

        let found = service.find(stored.id).unwrap();
        let contents: Vec<_> = found
            .blocks
            .iter()
            .map(|b| match &b.content {
                BlockContent::RichText { content } => content.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(contents, vec!["zeroth", "first", "second"]);
        assert_eq!(found.sequences(), vec![1, 2, 3]);
    }

    #[test]
    fn test_store_detaches_unlisted_blocks() {
        let service = service();
        let mut learnplace = service.create(11, location()).unwrap();
        learnplace.push(text("a")).unwrap();
        learnplace.push(text("b")).unwrap();
        let mut stored = service.store(learnplace).unwrap();

        let removed = stored.blocks[0].id;
        stored.remove(removed).unwrap();
        service.store(stored).unwrap();

        let found = service.find_by_object_id(11).unwrap();
        assert_eq!(found.blocks.len(), 1);
        assert_eq!(found.sequences(), vec![1]);
        assert!(found.find(removed).is_none());
    }

    #[test]
    fn test_regenerate_after_delete_closes_gap() {
        let service = service();
        let mut learnplace = service.create(11, location()).unwrap();
        for name in ["a", "b", "c"] {
            learnplace.push(text(name)).unwrap();
        }
        let stored = service.store(learnplace).unwrap();

        service
            .db
            .with_conn(|conn| blocks::delete_block(conn, stored.blocks[1].id))
            .unwrap();
        assert_eq!(service.find(stored.id).unwrap().sequences(), vec![1, 3]);

        let regenerated = service.store(service.find_by_object_id(11).unwrap()).unwrap();
        assert_eq!(regenerated.sequences(), vec![1, 2]);
        assert_eq!(service.find(stored.id).unwrap().sequences(), vec![1, 2]);
    }

    #[test]
    fn test_list_pages_by_object_id() {
        let service = service();
        let mut second = service.create(12, location()).unwrap();
        second.push(text("ignored")).unwrap();
        service.store(second).unwrap();
        service.create(11, location()).unwrap();

        let all = service.list(10, 0).unwrap();
        assert_eq!(all.iter().map(|l| l.object_id).collect::<Vec<_>>(), vec![11, 12]);
        assert!(all.iter().all(|l| l.blocks.is_empty()));

        let page = service.list(1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].object_id, 12);
        assert!(service.list(10, 2).unwrap().is_empty());
    }

    #[test]
    fn test_has_map() {
        let service = service();
        assert!(!service.has_map(11).unwrap());

        let mut learnplace = service.create(11, location()).unwrap();
        assert!(!service.has_map(11).unwrap());

        learnplace.push(Block::new(BlockContent::Map)).unwrap();
        service.store(learnplace).unwrap();
        assert!(service.has_map(11).unwrap());
    }

    #[test]
    fn test_delete_cascades_blocks() {
        let service = service();
        let mut learnplace = service.create(11, location()).unwrap();
        learnplace.push(text("gone")).unwrap();
        let stored = service.store(learnplace).unwrap();

        service.delete(stored.id).unwrap();
        assert_eq!(service.db.stats().unwrap().block_count, 0);
        assert!(matches!(service.delete(stored.id), Err(LearnplaceError::NotFound(_))));
    }
}
