//! Ordered block collections
//!
//! Learnplaces and accordions both own an ordered list of blocks. The
//! [`BlockCollection`] trait carries the list operations shared by both:
//!
//! - `insert` places a block at a position clamped to `0..=len`
//! - `remove` takes a block out by id
//! - `move_block` is a remove followed by an insert
//!
//! After every structural change the sequence numbers of the container are
//! regenerated as `1..=len` in list order.

use std::collections::HashSet;

use tracing::trace;

use crate::error::LearnplaceError;
use crate::model::{Accordion, Block, BlockKind, Container, Entity, Learnplace};

/// Clamp a caller supplied position into `0..=len`
pub fn clamp_position(position: i64, len: usize) -> usize {
    if position <= 0 {
        0
    } else {
        usize::try_from(position).map_or(len, |p| p.min(len))
    }
}

pub trait BlockCollection {
    fn container(&self) -> Container;

    fn blocks(&self) -> &[Block];

    fn blocks_mut(&mut self) -> &mut Vec<Block>;

    /// Container specific rules the current block list must satisfy
    fn check_layout(&self) -> Result<(), LearnplaceError>;

    fn len(&self) -> usize {
        self.blocks().len()
    }

    fn is_empty(&self) -> bool {
        self.blocks().is_empty()
    }

    fn position_of(&self, block_id: i64) -> Option<usize> {
        self.blocks().iter().position(|b| b.id == block_id)
    }

    fn find(&self, block_id: i64) -> Option<&Block> {
        self.blocks().iter().find(|b| b.id == block_id)
    }

    /// Sequence numbers in list order
    fn sequences(&self) -> Vec<i32> {
        self.blocks().iter().map(|b| b.sequence).collect()
    }

    /// Renumber all blocks as `1..=len` in list order
    fn regenerate_sequence(&mut self) {
        for (index, block) in self.blocks_mut().iter_mut().enumerate() {
            block.sequence = index as i32 + 1;
        }
    }

    /// Insert `block` at `position` (clamped to `0..=len`), returning the index used
    fn insert(&mut self, block: Block, position: usize) -> Result<usize, LearnplaceError> {
        block.validate()?;
        if !block.is_new() && self.position_of(block.id).is_some() {
            return Err(LearnplaceError::Validation(format!(
                "block {} is already part of {}",
                block.id,
                self.container()
            )));
        }

        let index = position.min(self.len());
        trace!(container = %self.container(), block_id = block.id, index, "Inserting block");
        self.blocks_mut().insert(index, block);
        if let Err(e) = self.check_layout() {
            self.blocks_mut().remove(index);
            return Err(e);
        }
        self.regenerate_sequence();
        Ok(index)
    }

    /// Validate every block, id uniqueness and the container rules
    fn validate_order(&self) -> Result<(), LearnplaceError> {
        let mut seen = HashSet::new();
        for block in self.blocks() {
            block.validate()?;
            if !block.is_new() && !seen.insert(block.id) {
                return Err(LearnplaceError::Validation(format!(
                    "block {} appears more than once in {}",
                    block.id,
                    self.container()
                )));
            }
        }
        self.check_layout()
    }

    /// Append `block` at the end of the list
    fn push(&mut self, block: Block) -> Result<usize, LearnplaceError> {
        let len = self.len();
        self.insert(block, len)
    }

    /// Remove the block with `block_id`; the container is unchanged on error
    fn remove(&mut self, block_id: i64) -> Result<Block, LearnplaceError> {
        let index = self.position_of(block_id).ok_or_else(|| {
            LearnplaceError::NotFound(format!("block {} in {}", block_id, self.container()))
        })?;
        let block = self.blocks_mut().remove(index);
        self.regenerate_sequence();
        Ok(block)
    }

    /// Move a block to `position`, interpreted against the list without the block
    fn move_block(&mut self, block_id: i64, position: usize) -> Result<usize, LearnplaceError> {
        let from = self.position_of(block_id).ok_or_else(|| {
            LearnplaceError::NotFound(format!("block {} in {}", block_id, self.container()))
        })?;
        let block = self.blocks_mut().remove(from);
        let to = position.min(self.len());
        self.blocks_mut().insert(to, block);
        self.regenerate_sequence();
        Ok(to)
    }
}

impl BlockCollection for Learnplace {
    fn container(&self) -> Container {
        Learnplace::container(self)
    }

    fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    fn check_layout(&self) -> Result<(), LearnplaceError> {
        if self.blocks.iter().filter(|b| b.kind() == BlockKind::Map).count() > 1 {
            return Err(LearnplaceError::Validation(
                "a learnplace holds at most one map block".into(),
            ));
        }
        Ok(())
    }
}

impl BlockCollection for Accordion {
    fn container(&self) -> Container {
        Accordion::container(self)
    }

    fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    fn check_layout(&self) -> Result<(), LearnplaceError> {
        if let Some(block) = self.blocks.iter().find(|b| !b.kind().nestable()) {
            return Err(LearnplaceError::Validation(format!(
                "{} blocks cannot be placed inside an accordion",
                block.kind()
            )));
        }
        Ok(())
    }
}
