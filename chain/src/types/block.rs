//! Block types and canonical hashing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::Value;
use crate::hashcash;

use super::{Address, Hash256, Move, created_at_format};

/// Error returned by [`Block::validate`]. Kept separate from
/// [`crate::error::BlockError`] so this module has no dependency on move
/// execution; the two are unified at the sync/miner call sites.
pub use crate::error::BlockError;

/// A mined block: header fields plus the moves it confirms.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub id: u64,
    pub prev_hash: Option<Hash256>,
    pub creator: Address,
    #[serde(with = "created_at_format")]
    pub created_at: DateTime<Utc>,
    pub root_hash: Hash256,
    pub difficulty: u32,
    pub suffix: String,
    pub hash: Hash256,
    #[serde(default)]
    pub moves: Vec<Move>,
}

impl Block {
    /// Root hash over the sorted set of move ids in this block.
    pub fn compute_root_hash(moves: &[Move]) -> Hash256 {
        let mut ids: Vec<String> = moves.iter().map(|m| m.id.to_hex()).collect();
        ids.sort();
        Hash256::compute(ids.concat().as_bytes())
    }

    /// Canonical value used for both hashcash and the final block hash.
    /// Excludes `suffix`, `hash`, and `moves`: the first two would be
    /// circular, and moves are covered separately via `root_hash`.
    pub fn canonical_value(
        id: u64,
        prev_hash: Option<&Hash256>,
        creator: &Address,
        difficulty: u32,
        root_hash: &Hash256,
        created_at: &DateTime<Utc>,
    ) -> Value {
        Value::dict()
            .entry("id", Value::Int(id as i64))
            .entry("creator", Value::str(creator.0.clone()))
            .entry("difficulty", Value::Int(difficulty as i64))
            .entry("root_hash", Value::str(root_hash.to_hex()))
            .entry(
                "created_at",
                Value::str(created_at.format(created_at_format::FORMAT).to_string()),
            )
            .entry_opt("prev_hash", prev_hash.map(|h| Value::str(h.to_hex())))
            .build()
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        Self::canonical_value(
            self.id,
            self.prev_hash.as_ref(),
            &self.creator,
            self.difficulty,
            &self.root_hash,
            &self.created_at,
        )
        .encode()
    }

    /// Computes the final block hash: `SHA256(canonical || suffix)`.
    pub fn compute_hash(&self) -> Hash256 {
        let mut bytes = self.canonical_bytes();
        bytes.extend(self.suffix.as_bytes());
        Hash256::compute(&bytes)
    }

    /// Full validity contract: hash, proof-of-work, root hash, and every
    /// contained move's own validity and block-id attribution. Chain
    /// continuity (matching the predecessor's hash) is checked by the
    /// caller, which alone knows the local chain.
    pub fn validate(&self) -> Result<(), BlockError> {
        if self.compute_hash() != self.hash {
            return Err(BlockError::BadHash);
        }

        if !hashcash::check(&self.canonical_bytes(), &self.suffix, self.difficulty) {
            return Err(BlockError::InsufficientWork);
        }

        if Self::compute_root_hash(&self.moves) != self.root_hash {
            return Err(BlockError::BadRootHash);
        }

        for mv in &self.moves {
            mv.validate()?;
            if mv.block_id != Some(self.id) {
                return Err(BlockError::MoveBlockIdMismatch(mv.id.to_hex()));
            }
        }

        Ok(())
    }

    pub fn is_genesis(&self) -> bool {
        self.id == 1 && self.prev_hash.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MoveDetails, MoveName};

    fn dt() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn build_block(moves: Vec<Move>, difficulty: u32, prev_hash: Option<Hash256>, id: u64) -> Block {
        let creator = Address("creator-address".to_string());
        let root_hash = Block::compute_root_hash(&moves);
        let created_at = dt();
        let canonical =
            Block::canonical_value(id, prev_hash.as_ref(), &creator, difficulty, &root_hash, &created_at)
                .encode();
        let suffix = hashcash::mint(&canonical, difficulty);

        let mut block = Block {
            id,
            prev_hash,
            creator,
            created_at,
            root_hash,
            difficulty,
            suffix,
            hash: Hash256([0; super::super::HASH_LEN]),
            moves,
        };
        block.hash = block.compute_hash();
        block
    }

    #[test]
    fn genesis_block_with_valid_pow_and_moves_validates() {
        let mv = Move::create_signed("alice", MoveName::CreateNovice, MoveDetails::new(), 0, dt());
        let mut mv = mv;
        mv.block_id = Some(1);

        let block = build_block(vec![mv], 0, None, 1);
        assert!(block.validate().is_ok());
        assert!(block.is_genesis());
    }

    #[test]
    fn tampering_with_root_hash_is_rejected() {
        let mut block = build_block(vec![], 0, None, 1);
        block.root_hash = Hash256::compute(b"not the real root");
        block.hash = block.compute_hash();

        assert!(matches!(
            block.validate().unwrap_err(),
            BlockError::BadRootHash
        ));
    }

    #[test]
    fn insufficient_work_is_rejected() {
        let mut block = build_block(vec![], 4, None, 1);
        block.suffix = "not-a-valid-suffix".to_string();
        block.hash = block.compute_hash();

        assert!(matches!(
            block.validate().unwrap_err(),
            BlockError::InsufficientWork
        ));
    }

    #[test]
    fn omitted_prev_hash_changes_genesis_hash_vs_explicit_zero_hash() {
        let moves = vec![];
        let with_none = build_block(moves.clone(), 0, None, 1);
        let with_zero = build_block(moves, 0, Some(Hash256([0; super::super::HASH_LEN])), 1);
        assert_ne!(with_none.hash, with_zero.hash);
    }
}
