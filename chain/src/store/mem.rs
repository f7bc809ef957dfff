//! In-memory chain store, used in tests and as a devnet/sandbox backend.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::types::{Block, Hash256, Move, MoveName};

use super::ChainStore;

#[derive(Default)]
pub struct InMemoryChainStore {
    blocks_by_id: HashMap<u64, Block>,
    hash_to_id: HashMap<Hash256, u64>,
    tip_id: Option<u64>,
    moves: HashMap<Hash256, Move>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainStore for InMemoryChainStore {
    fn get_block_by_id(&self, id: u64) -> Option<Block> {
        self.blocks_by_id.get(&id).cloned()
    }

    fn get_block_by_hash(&self, hash: &Hash256) -> Option<Block> {
        self.hash_to_id
            .get(hash)
            .and_then(|id| self.blocks_by_id.get(id))
            .cloned()
    }

    fn tip_id(&self) -> Option<u64> {
        self.tip_id
    }

    fn put_block(&mut self, block: Block) -> Result<(), StoreError> {
        for mv in &block.moves {
            let mut mv = mv.clone();
            mv.block_id = Some(block.id);
            self.moves.insert(mv.id, mv);
        }

        self.hash_to_id.insert(block.hash, block.id);
        let id = block.id;
        self.blocks_by_id.insert(id, block);

        let becomes_tip = match self.tip_id {
            Some(tip) => id > tip,
            None => true,
        };
        if becomes_tip {
            self.tip_id = Some(id);
        }

        Ok(())
    }

    fn truncate_after(&mut self, keep_id: u64) -> Result<Vec<Move>, StoreError> {
        let stale_ids: Vec<u64> = self
            .blocks_by_id
            .keys()
            .copied()
            .filter(|id| *id > keep_id)
            .collect();

        let mut detached = Vec::new();
        for id in stale_ids {
            if let Some(block) = self.blocks_by_id.remove(&id) {
                self.hash_to_id.remove(&block.hash);
                for mv in block.moves {
                    let mut mv = mv;
                    mv.block_id = None;
                    self.moves.insert(mv.id, mv.clone());
                    detached.push(mv);
                }
            }
        }

        self.tip_id = self.blocks_by_id.keys().copied().max();
        Ok(detached)
    }

    fn blocks_from(&self, from_id: u64) -> Vec<Block> {
        let mut ids: Vec<u64> = self
            .blocks_by_id
            .keys()
            .copied()
            .filter(|id| *id >= from_id)
            .collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| self.blocks_by_id.get(&id).cloned())
            .collect()
    }

    fn get_move(&self, id: &Hash256) -> Option<Move> {
        self.moves.get(id).cloned()
    }

    fn put_unconfirmed_move(&mut self, mv: Move) -> Result<(), StoreError> {
        self.moves.insert(mv.id, mv);
        Ok(())
    }

    fn unconfirmed_moves(&self) -> Vec<Move> {
        self.moves
            .values()
            .filter(|mv| mv.block_id.is_none())
            .cloned()
            .collect()
    }

    fn moves_by_user(&self, user: &str) -> Vec<Move> {
        let mut moves: Vec<Move> = self
            .moves
            .values()
            .filter(|mv| mv.user.0 == user)
            .cloned()
            .collect();
        moves.sort_by_key(|mv| (mv.block_id.unwrap_or(u64::MAX), mv.id.to_hex()));
        moves
    }

    fn moves_sent_to(&self, address: &str) -> Vec<Move> {
        let mut moves: Vec<Move> = self
            .moves
            .values()
            .filter(|mv| {
                mv.block_id.is_some()
                    && mv.name == MoveName::Send
                    && mv.detail("receiver") == Some(address)
            })
            .cloned()
            .collect();
        moves.sort_by_key(|mv| (mv.block_id.unwrap_or(u64::MAX), mv.id.to_hex()));
        moves
    }

    fn blocks_mined_by(&self, address: &str, ceiling: u64) -> u64 {
        self.blocks_by_id
            .values()
            .filter(|b| b.id <= ceiling && b.creator.0 == address)
            .count() as u64
    }
}
