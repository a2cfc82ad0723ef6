//! Writes the block order of a container

use rusqlite::Connection;

use crate::collection::BlockCollection;
use crate::db::blocks;
use crate::error::LearnplaceError;
use crate::model::Entity;

/// Persist the list order of `collection`
///
/// New blocks are inserted, every listed block is attached with its
/// regenerated sequence, and blocks that were in the container before but are
/// no longer listed are detached. Returns the number of detached blocks.
pub(crate) fn persist_order<C: BlockCollection>(
    conn: &Connection,
    collection: &mut C,
) -> Result<usize, LearnplaceError> {
    collection.validate_order()?;
    collection.regenerate_sequence();
    let container = collection.container();

    for block in collection.blocks_mut().iter_mut() {
        if block.is_new() {
            block.id = blocks::insert_block(conn, block)?;
        }
        if !blocks::attach_block(conn, block.id, container, block.sequence)? {
            return Err(LearnplaceError::NotFound(format!("block {}", block.id)));
        }
    }

    let keep: Vec<i64> = collection.blocks().iter().map(|b| b.id).collect();
    blocks::detach_others(conn, container, &keep)
}
