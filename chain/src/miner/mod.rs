//! Block production.
//!
//! Builds a candidate block on top of the current tip, adjusts difficulty
//! from recent block cadence, mints proof-of-work, and persists the result.
//! This does not run on a timer itself; callers (the node's main loop) drive
//! it on whatever cadence their [`crate::config::MiningConfig`] specifies.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::hashcash;
use crate::store::ChainStore;
use crate::types::{Address, Block, Hash256, Move};

/// Target block cadence. Below the low threshold the network is minting too
/// fast and difficulty rises; above the high threshold it eases back down.
const DIFFICULTY_RAISE_THRESHOLD_SECS: i64 = 5;
const DIFFICULTY_LOWER_THRESHOLD_SECS: i64 = 15;

/// Window of trailing blocks used to estimate average block time.
const DIFFICULTY_WINDOW: u64 = 10;

/// Outcome of a single [`mine_block`] attempt.
#[derive(Debug)]
pub enum MineOutcome {
    /// A new block was minted and persisted.
    Minted(Block),
    /// Another block at the same height was persisted first; this attempt
    /// is abandoned without touching the store.
    LostRace,
}

/// Builds, mints, and persists the next block on top of the store's current
/// tip, using every currently unconfirmed move that still validates (see
/// [`validated_mempool`]).
///
/// `now` is injected by the caller (rather than read from the wall clock
/// here) so the difficulty-adjustment window stays deterministic in tests.
pub fn mine_block<S: ChainStore>(
    store: &mut S,
    creator: Address,
    now: DateTime<Utc>,
) -> Result<MineOutcome, StoreError> {
    let moves = validated_mempool(store);
    let (next_id, prev_hash, difficulty) = match store.tip() {
        Some(tip) => {
            let next_id = tip.id + 1;
            let difficulty = adjust_difficulty(store, &tip, next_id, now);
            (next_id, Some(tip.hash), difficulty)
        }
        None => (1, None, 0),
    };

    let root_hash = Block::compute_root_hash(&moves);
    let canonical =
        Block::canonical_value(next_id, prev_hash.as_ref(), &creator, difficulty, &root_hash, &now)
            .encode();
    let suffix = hashcash::mint(&canonical, difficulty);

    if store.get_block_by_id(next_id).is_some() {
        return Ok(MineOutcome::LostRace);
    }

    let mut block = Block {
        id: next_id,
        prev_hash,
        creator,
        created_at: now,
        root_hash,
        difficulty,
        suffix,
        hash: Hash256([0; crate::types::HASH_LEN]),
        moves,
    };
    block.hash = block.compute_hash();

    store.put_block(block.clone())?;
    Ok(MineOutcome::Minted(block))
}

/// Inherits difficulty from the current tip and nudges it based on the
/// average block time over the trailing [`DIFFICULTY_WINDOW`] blocks.
fn adjust_difficulty<S: ChainStore>(
    store: &S,
    tip: &Block,
    next_id: u64,
    now: DateTime<Utc>,
) -> u32 {
    let window_start_id = next_id.saturating_sub(DIFFICULTY_WINDOW).max(1);
    let Some(window_start) = store.get_block_by_id(window_start_id) else {
        return tip.difficulty;
    };

    let elapsed = (now - window_start.created_at).num_seconds();
    let span = (next_id - window_start.id).max(1) as i64;
    let avg_dt = elapsed / span;

    if avg_dt <= DIFFICULTY_RAISE_THRESHOLD_SECS {
        tip.difficulty + 1
    } else if avg_dt > DIFFICULTY_LOWER_THRESHOLD_SECS {
        tip.difficulty.saturating_sub(1)
    } else {
        tip.difficulty
    }
}

/// Collects the unconfirmed moves currently sitting in the mempool,
/// validating each one and discarding those that no longer hold up (e.g.
/// signature no longer matches after a detached re-submission). Called by
/// [`mine_block`] so a stale or tampered mempool entry never makes it into a
/// minted block.
pub fn validated_mempool<S: ChainStore>(store: &S) -> Vec<Move> {
    store
        .unconfirmed_moves()
        .into_iter()
        .filter(|mv| mv.validate().is_ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryChainStore;

    fn dt(secs_from_epoch: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs_from_epoch, 0).unwrap()
    }

    #[test]
    fn mines_genesis_block_with_difficulty_zero() {
        let mut store = InMemoryChainStore::new();
        let creator = Address("miner".to_string());

        let outcome = mine_block(&mut store, creator, dt(1_700_000_000)).unwrap();
        match outcome {
            MineOutcome::Minted(block) => {
                assert_eq!(block.id, 1);
                assert_eq!(block.difficulty, 0);
                assert!(block.is_genesis());
            }
            MineOutcome::LostRace => panic!("expected a fresh genesis block"),
        }
        assert_eq!(store.tip_id(), Some(1));
    }

    #[test]
    fn fast_cadence_over_the_window_raises_difficulty() {
        let mut store = InMemoryChainStore::new();
        let creator = Address("miner".to_string());

        let mut t = 1_700_000_000;
        for _ in 0..10 {
            mine_block(&mut store, creator.clone(), dt(t)).unwrap();
            t += 4; // well under the 5s raise threshold
        }

        let tip = store.tip().unwrap();
        assert!(tip.difficulty >= 1, "expected difficulty to have risen");
    }

    #[test]
    fn slow_cadence_keeps_difficulty_at_floor() {
        let mut store = InMemoryChainStore::new();
        let creator = Address("miner".to_string());

        let mut t = 1_700_000_000;
        for _ in 0..3 {
            mine_block(&mut store, creator.clone(), dt(t)).unwrap();
            t += 60; // well over the 15s lower threshold
        }

        let tip = store.tip().unwrap();
        assert_eq!(tip.difficulty, 0, "difficulty cannot go below zero");
    }

    #[test]
    fn invalid_mempool_moves_are_dropped_before_minting() {
        use crate::types::{MoveDetails, MoveName};

        let mut store = InMemoryChainStore::new();
        let creator = Address("miner".to_string());

        let good = crate::types::Move::create_signed(
            "alice",
            MoveName::CreateNovice,
            MoveDetails::new(),
            0,
            dt(1_700_000_000),
        );
        let mut bad = good.clone();
        bad.id = crate::types::Hash256::compute(b"not the real id");
        store.put_unconfirmed_move(good.clone()).unwrap();
        store.put_unconfirmed_move(bad).unwrap();

        let outcome = mine_block(&mut store, creator, dt(1_700_000_000)).unwrap();
        match outcome {
            MineOutcome::Minted(block) => {
                assert_eq!(block.moves.len(), 1);
                assert_eq!(block.moves[0].id, good.id);
            }
            MineOutcome::LostRace => panic!("expected a fresh genesis block"),
        }
    }

    #[test]
    fn race_loss_is_reported_without_mutating_the_store() {
        let mut store = InMemoryChainStore::new();
        let creator = Address("miner".to_string());
        mine_block(&mut store, creator.clone(), dt(1_700_000_000)).unwrap();

        // Someone else's block at id 2 lands first.
        let rival = crate::store::test_support::build_block(2, store.tip().map(|b| b.hash), vec![]);
        store.put_block(rival).unwrap();

        let before_tip = store.tip_id();
        let outcome = mine_block(&mut store, creator, dt(1_700_000_010)).unwrap();
        assert!(matches!(outcome, MineOutcome::LostRace));
        assert_eq!(store.tip_id(), before_tip);
    }
}
