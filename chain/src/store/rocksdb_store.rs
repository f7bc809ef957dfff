//! RocksDB-backed chain store.
//!
//! Column families:
//!
//! - `"blocks"`: big-endian `u64` id -> JSON-encoded [`Block`] (including
//!   its moves),
//! - `"block_hash_index"`: block hash bytes -> big-endian `u64` id,
//! - `"moves"`: move id bytes -> JSON-encoded [`Move`] (confirmed and
//!   unconfirmed alike; `block_id` distinguishes them),
//! - `"meta"`: fixed keys, currently just `"tip"` -> big-endian `u64`.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DB, Options};

use crate::error::StoreError;
use crate::types::{Block, Hash256, Move, MoveName};

use super::ChainStore;

/// Configuration for [`RocksDbChainStore`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    pub path: String,
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "data/chain-db".to_string(),
            create_if_missing: true,
        }
    }
}

pub struct RocksDbChainStore {
    db: DB,
}

impl RocksDbChainStore {
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StoreError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new("blocks", Options::default()),
            ColumnFamilyDescriptor::new("block_hash_index", Options::default()),
            ColumnFamilyDescriptor::new("moves", Options::default()),
            ColumnFamilyDescriptor::new("meta", Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { db })
    }

    fn cf(&self, name: &'static str) -> Result<Arc<BoundColumnFamily<'_>>, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("missing column family: {name}")))
    }

    fn put_move(&self, mv: &Move) -> Result<(), StoreError> {
        let cf = self.cf("moves")?;
        let bytes =
            serde_json::to_vec(mv).map_err(|e| StoreError::Backend(format!("encode move: {e}")))?;
        self.db
            .put_cf(&cf, mv.id.as_bytes(), bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn all_moves(&self) -> Result<Vec<Move>, StoreError> {
        let cf = self.cf("moves")?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Backend(e.to_string()))?;
            if let Ok(mv) = serde_json::from_slice::<Move>(&value) {
                out.push(mv);
            }
        }
        Ok(out)
    }
}

impl ChainStore for RocksDbChainStore {
    fn get_block_by_id(&self, id: u64) -> Option<Block> {
        let cf = self.cf("blocks").ok()?;
        let bytes = self.db.get_cf(&cf, id.to_be_bytes()).ok()??;
        serde_json::from_slice(&bytes).ok()
    }

    fn get_block_by_hash(&self, hash: &Hash256) -> Option<Block> {
        let index_cf = self.cf("block_hash_index").ok()?;
        let id_bytes = self.db.get_cf(&index_cf, hash.as_bytes()).ok()??;
        let id = u64::from_be_bytes(id_bytes.try_into().ok()?);
        self.get_block_by_id(id)
    }

    fn tip_id(&self) -> Option<u64> {
        let cf = self.cf("meta").ok()?;
        let bytes = self.db.get_cf(&cf, b"tip").ok()??;
        Some(u64::from_be_bytes(bytes.try_into().ok()?))
    }

    fn put_block(&mut self, mut block: Block) -> Result<(), StoreError> {
        for mv in block.moves.iter_mut() {
            mv.block_id = Some(block.id);
            self.put_move(mv)?;
        }

        let blocks_cf = self.cf("blocks")?;
        let index_cf = self.cf("meta")?;
        let hash_cf = self.cf("block_hash_index")?;

        let bytes = serde_json::to_vec(&block)
            .map_err(|e| StoreError::Backend(format!("encode block: {e}")))?;
        self.db
            .put_cf(&blocks_cf, block.id.to_be_bytes(), bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.db
            .put_cf(&hash_cf, block.hash.as_bytes(), block.id.to_be_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let current_tip = self.tip_id();
        if current_tip.is_none() || block.id > current_tip.unwrap() {
            self.db
                .put_cf(&index_cf, b"tip", block.id.to_be_bytes())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }

        Ok(())
    }

    fn truncate_after(&mut self, keep_id: u64) -> Result<Vec<Move>, StoreError> {
        let mut detached = Vec::new();
        let mut id = keep_id + 1;
        let blocks_cf = self.cf("blocks")?;
        let hash_cf = self.cf("block_hash_index")?;
        let meta_cf = self.cf("meta")?;

        loop {
            let Some(block) = self.get_block_by_id(id) else {
                break;
            };
            self.db
                .delete_cf(&blocks_cf, id.to_be_bytes())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            self.db
                .delete_cf(&hash_cf, block.hash.as_bytes())
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            for mv in block.moves {
                let mut mv = mv;
                mv.block_id = None;
                self.put_move(&mv)?;
                detached.push(mv);
            }

            id += 1;
        }

        if keep_id == 0 {
            self.db
                .delete_cf(&meta_cf, b"tip")
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        } else {
            self.db
                .put_cf(&meta_cf, b"tip", keep_id.to_be_bytes())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }

        Ok(detached)
    }

    fn blocks_from(&self, from_id: u64) -> Vec<Block> {
        let mut out = Vec::new();
        let mut id = from_id;
        while let Some(block) = self.get_block_by_id(id) {
            out.push(block);
            id += 1;
        }
        out
    }

    fn get_move(&self, id: &Hash256) -> Option<Move> {
        let cf = self.cf("moves").ok()?;
        let bytes = self.db.get_cf(&cf, id.as_bytes()).ok()??;
        serde_json::from_slice(&bytes).ok()
    }

    fn put_unconfirmed_move(&mut self, mv: Move) -> Result<(), StoreError> {
        self.put_move(&mv)
    }

    fn unconfirmed_moves(&self) -> Vec<Move> {
        self.all_moves()
            .unwrap_or_default()
            .into_iter()
            .filter(|mv| mv.block_id.is_none())
            .collect()
    }

    fn moves_by_user(&self, user: &str) -> Vec<Move> {
        let mut moves: Vec<Move> = self
            .all_moves()
            .unwrap_or_default()
            .into_iter()
            .filter(|mv| mv.user.0 == user)
            .collect();
        moves.sort_by_key(|mv| (mv.block_id.unwrap_or(u64::MAX), mv.id.to_hex()));
        moves
    }

    fn moves_sent_to(&self, address: &str) -> Vec<Move> {
        let mut moves: Vec<Move> = self
            .all_moves()
            .unwrap_or_default()
            .into_iter()
            .filter(|mv| {
                mv.block_id.is_some()
                    && mv.name == MoveName::Send
                    && mv.detail("receiver") == Some(address)
            })
            .collect();
        moves.sort_by_key(|mv| (mv.block_id.unwrap_or(u64::MAX), mv.id.to_hex()));
        moves
    }

    fn blocks_mined_by(&self, address: &str, ceiling: u64) -> u64 {
        let mut count = 0;
        let mut id = 1;
        while id <= ceiling {
            if let Some(block) = self.get_block_by_id(id) {
                if block.creator.0 == address {
                    count += 1;
                }
            }
            id += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::build_block;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rocksdb_store_roundtrips_block_and_tip() {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = RocksDbConfig {
            path: tmp.path().to_string_lossy().to_string(),
            create_if_missing: true,
        };
        let mut store = RocksDbChainStore::open(&cfg).expect("open rocksdb");

        let block = build_block(1, None, vec![]);
        let hash = block.hash;
        store.put_block(block).unwrap();

        assert_eq!(store.tip_id(), Some(1));
        assert_eq!(store.get_block_by_hash(&hash).unwrap().id, 1);
    }

    #[test]
    fn truncate_after_removes_blocks_above_threshold() {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = RocksDbConfig {
            path: tmp.path().to_string_lossy().to_string(),
            create_if_missing: true,
        };
        let mut store = RocksDbChainStore::open(&cfg).expect("open rocksdb");

        let b1 = build_block(1, None, vec![]);
        let h1 = b1.hash;
        store.put_block(b1).unwrap();
        let b2 = build_block(2, Some(h1), vec![]);
        store.put_block(b2).unwrap();

        store.truncate_after(1).unwrap();
        assert_eq!(store.tip_id(), Some(1));
        assert!(store.get_block_by_id(2).is_none());
    }
}
