//! Property-based tests for the ordered block collection
//!
//! Generates learnplaces of text blocks with distinct ids and checks the
//! ordering laws of insert, remove and move.

use learnplaces::{Block, BlockCollection, BlockContent, Learnplace, LearnplaceError, Location};
use proptest::prelude::*;

fn text(id: i64) -> Block {
    let mut block = Block::new(BlockContent::RichText { content: format!("block {}", id) });
    block.id = id;
    block
}

fn learnplace(len: usize) -> Learnplace {
    let mut learnplace = Learnplace::new(
        1,
        Location { latitude: 0.0, longitude: 0.0, elevation: 0.0, radius: 1 },
    );
    for id in 1..=len as i64 {
        learnplace.push(text(id)).unwrap();
    }
    learnplace
}

fn ids(learnplace: &Learnplace) -> Vec<i64> {
    learnplace.blocks.iter().map(|b| b.id).collect()
}

fn contiguous(len: usize) -> Vec<i32> {
    (1..=len as i32).collect()
}

/// A container length together with a position in `0..=len`
fn len_and_position() -> impl Strategy<Value = (usize, usize)> {
    (0usize..24).prop_flat_map(|len| (Just(len), 0..=len))
}

proptest! {
    #[test]
    fn insert_places_block_at_position((len, position) in len_and_position()) {
        let mut learnplace = learnplace(len);
        let before = ids(&learnplace);

        let index = learnplace.insert(text(1000), position).unwrap();

        prop_assert_eq!(index, position);
        prop_assert_eq!(learnplace.len(), len + 1);
        prop_assert_eq!(learnplace.blocks[position].id, 1000);
        let after = ids(&learnplace);
        prop_assert_eq!(&after[..position], &before[..position]);
        prop_assert_eq!(&after[position + 1..], &before[position..]);
        prop_assert_eq!(learnplace.sequences(), contiguous(len + 1));
    }

    #[test]
    fn insert_clamps_out_of_range_positions(len in 0usize..24, overshoot in 1usize..1000) {
        let mut learnplace = learnplace(len);
        prop_assert_eq!(learnplace.insert(text(1000), len + overshoot).unwrap(), len);
        prop_assert_eq!(learnplace.blocks.last().map(|b| b.id), Some(1000));
    }

    #[test]
    fn remove_keeps_relative_order(len in 1usize..24, pick in any::<prop::sample::Index>()) {
        let mut learnplace = learnplace(len);
        let before = ids(&learnplace);
        let victim = before[pick.index(len)];

        let removed = learnplace.remove(victim).unwrap();

        let expected: Vec<i64> = before.into_iter().filter(|id| *id != victim).collect();
        prop_assert_eq!(removed.id, victim);
        prop_assert_eq!(ids(&learnplace), expected);
        prop_assert_eq!(learnplace.sequences(), contiguous(len - 1));
    }

    #[test]
    fn remove_missing_is_not_found(len in 0usize..24, missing in 100i64..200) {
        let mut learnplace = learnplace(len);
        let before = learnplace.clone();

        let result = learnplace.remove(missing);
        prop_assert!(matches!(result, Err(LearnplaceError::NotFound(_))));
        prop_assert_eq!(learnplace, before);
    }

    #[test]
    fn insert_then_remove_round_trips((len, position) in len_and_position()) {
        let mut learnplace = learnplace(len);
        let before = learnplace.clone();

        learnplace.insert(text(1000), position).unwrap();
        learnplace.remove(1000).unwrap();

        prop_assert_eq!(learnplace, before);
    }

    #[test]
    fn move_keeps_membership(len in 1usize..24, pick in any::<prop::sample::Index>(), to in 0usize..30) {
        let mut learnplace = learnplace(len);
        let moved = ids(&learnplace)[pick.index(len)];

        let index = learnplace.move_block(moved, to).unwrap();

        prop_assert_eq!(index, to.min(len - 1));
        prop_assert_eq!(learnplace.blocks[index].id, moved);
        let mut sorted = ids(&learnplace);
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (1..=len as i64).collect::<Vec<_>>());
        prop_assert_eq!(learnplace.sequences(), contiguous(len));
    }
}
