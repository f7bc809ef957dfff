//! Persistent and in-memory storage backends for the chain.
//!
//! [`ChainStore`] is the single storage abstraction consumed by the miner,
//! sync engine, and avatar reconstructor. It is intentionally small:
//! consensus-level code never reaches into a concrete backend.

pub mod mem;
pub mod rocksdb_store;

pub use mem::InMemoryChainStore;
pub use rocksdb_store::{RocksDbChainStore, RocksDbConfig};

use crate::error::StoreError;
use crate::types::{Block, Hash256, Move};

/// Abstract storage interface used by the miner, sync engine, and
/// reconstructor.
pub trait ChainStore {
    fn get_block_by_id(&self, id: u64) -> Option<Block>;
    fn get_block_by_hash(&self, hash: &Hash256) -> Option<Block>;
    fn tip_id(&self) -> Option<u64>;

    fn tip(&self) -> Option<Block> {
        self.tip_id().and_then(|id| self.get_block_by_id(id))
    }

    /// Persists an already-validated block, attaching `block_id` to each of
    /// its moves and updating the tip if `block.id` is the new highest.
    fn put_block(&mut self, block: Block) -> Result<(), StoreError>;

    /// Deletes every block with id strictly greater than `keep_id`,
    /// returning their moves with `block_id` reset to `None` so the caller
    /// can reconsider them for inclusion in a future block.
    fn truncate_after(&mut self, keep_id: u64) -> Result<Vec<Move>, StoreError>;

    fn blocks_from(&self, from_id: u64) -> Vec<Block>;

    fn get_move(&self, id: &Hash256) -> Option<Move>;

    /// Adds a move to the mempool (unconfirmed: `block_id == None`).
    fn put_unconfirmed_move(&mut self, mv: Move) -> Result<(), StoreError>;

    fn unconfirmed_moves(&self) -> Vec<Move>;

    /// All moves (confirmed or not) authored by `user`, in ascending
    /// `(block_id, id)` order. Unconfirmed moves sort last.
    fn moves_by_user(&self, user: &str) -> Vec<Move>;

    /// All confirmed `send` moves whose `receiver` detail equals `address`.
    fn moves_sent_to(&self, address: &str) -> Vec<Move>;

    /// Number of blocks whose `creator` is `address`, with `id <= ceiling`.
    fn blocks_mined_by(&self, address: &str, ceiling: u64) -> u64;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::hashcash;
    use crate::types::Address;
    use chrono::{DateTime, Utc};

    pub fn dt() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    pub fn build_block(id: u64, prev_hash: Option<Hash256>, moves: Vec<Move>) -> Block {
        let creator = Address("miner".to_string());
        let root_hash = Block::compute_root_hash(&moves);
        let created_at = dt();
        let canonical = Block::canonical_value(id, prev_hash.as_ref(), &creator, 0, &root_hash, &created_at)
            .encode();
        let suffix = hashcash::mint(&canonical, 0);

        let mut block = Block {
            id,
            prev_hash,
            creator,
            created_at,
            root_hash,
            difficulty: 0,
            suffix,
            hash: Hash256([0; crate::types::HASH_LEN]),
            moves,
        };
        block.hash = block.compute_hash();
        block
    }
}
