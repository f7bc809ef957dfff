//! Peer synchronization: branch-point probing and catch-up replay.

pub mod http;

pub use http::ReqwestPeerClient;

use crate::error::SyncError;
use crate::store::ChainStore;
use crate::types::{Block, Move};

/// Abstraction over talking to a single remote peer. Exists so the sync
/// algorithm can be tested against an in-memory double instead of real
/// HTTP.
pub trait PeerClient {
    /// Highest block id the peer currently has, if any.
    async fn tip_id(&self) -> Result<Option<u64>, SyncError>;

    /// Fetches the peer's block at `id`, if it has one.
    async fn block_at(&self, id: u64) -> Result<Option<Block>, SyncError>;

    /// Fetches every peer block with id `>= from_id`, in ascending order.
    async fn blocks_from(&self, from_id: u64) -> Result<Vec<Block>, SyncError>;

    /// Broadcasts a freshly minted block to this peer.
    async fn post_block(&self, block: &Block, sent_node: Option<&str>) -> Result<(), SyncError>;

    /// Broadcasts a newly submitted move to this peer.
    async fn post_move(&self, mv: &Move, sent_node: Option<&str>) -> Result<(), SyncError>;
}

/// Runs the branch-point probe and catch-up replay against `peer`,
/// returning the number of blocks newly applied. A validation failure
/// anywhere in the catch-up aborts the whole sync and rolls the local
/// store back to its pre-sync tip.
pub async fn sync_with_peer<S, P>(store: &mut S, peer: &P) -> Result<u64, SyncError>
where
    S: ChainStore,
    P: PeerClient,
{
    let peer_tip_id = match peer.tip_id().await? {
        Some(id) => id,
        None => return Ok(0),
    };
    let local_tip_id = store.tip_id().unwrap_or(0);

    if local_tip_id >= peer_tip_id {
        return Ok(0);
    }

    let branch_point = find_branch_point(store, peer, local_tip_id).await?;

    let orphaned_blocks: Vec<Block> = ((branch_point + 1)..=local_tip_id)
        .filter_map(|id| store.get_block_by_id(id))
        .collect();

    store.truncate_after(branch_point)?;

    let peer_blocks = peer.blocks_from(branch_point + 1).await?;
    if let Err(err) = apply_catch_up(store, peer_blocks) {
        store.truncate_after(branch_point)?;
        for block in orphaned_blocks {
            store.put_block(block)?;
        }
        return Err(err);
    }

    Ok(store.tip_id().unwrap_or(0).saturating_sub(branch_point))
}

/// Finds the greatest block id `<= local_tip_id` whose hash matches the
/// peer's block at that id, per the branch-point probe algorithm: try the
/// local tip first, then binary search the remaining range.
async fn find_branch_point<S, P>(store: &S, peer: &P, local_tip_id: u64) -> Result<u64, SyncError>
where
    S: ChainStore,
    P: PeerClient,
{
    if local_tip_id == 0 {
        return Ok(0);
    }

    if hashes_match(store, peer, local_tip_id).await? {
        return Ok(local_tip_id);
    }

    let mut low: u64 = 0;
    let mut high: u64 = local_tip_id - 1;
    let mut matched: u64 = 0;

    while low <= high {
        let mid = low + (high - low) / 2;
        if hashes_match(store, peer, mid).await? {
            matched = mid;
            if mid == u64::MAX {
                break;
            }
            low = mid + 1;
        } else {
            if mid == 0 {
                break;
            }
            high = mid - 1;
        }
    }

    Ok(matched)
}

async fn hashes_match<S, P>(store: &S, peer: &P, id: u64) -> Result<bool, SyncError>
where
    S: ChainStore,
    P: PeerClient,
{
    if id == 0 {
        return Ok(true);
    }
    let local = store.get_block_by_id(id).map(|b| b.hash);
    let remote = peer.block_at(id).await?.map(|b| b.hash);
    Ok(matches!((local, remote), (Some(l), Some(r)) if l == r))
}

/// Validates and applies peer blocks in order, reusing existing mempool
/// moves by id where one is already known locally.
fn apply_catch_up<S: ChainStore>(store: &mut S, blocks: Vec<Block>) -> Result<(), SyncError> {
    for block in blocks {
        let reconciled = reconcile_moves(store, block.moves);
        let mut block = block;
        block.moves = reconciled;

        block
            .validate()
            .map_err(|source| SyncError::InvalidPeerBlock {
                height: block.id,
                source,
            })?;

        if let Some(prev_hash) = block.prev_hash {
            let continuity_ok = store
                .get_block_by_id(block.id - 1)
                .map(|b| b.hash == prev_hash)
                .unwrap_or(false);
            if !continuity_ok {
                return Err(SyncError::InvalidPeerBlock {
                    height: block.id,
                    source: crate::error::BlockError::BrokenContinuity,
                });
            }
        } else if block.id != 1 {
            return Err(SyncError::InvalidPeerBlock {
                height: block.id,
                source: crate::error::BlockError::BrokenContinuity,
            });
        }

        store.put_block(block)?;
    }
    Ok(())
}

/// Re-associates each incoming move with its locally known copy when the
/// ids match (preferring the store's existing row), leaving unknown moves
/// as-is.
fn reconcile_moves<S: ChainStore>(store: &S, moves: Vec<Move>) -> Vec<Move> {
    moves
        .into_iter()
        .map(|mv| store.get_move(&mv.id).unwrap_or(mv))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{test_support::build_block, InMemoryChainStore};
    use std::sync::Mutex;

    struct FakePeer {
        blocks: Mutex<Vec<Block>>,
    }

    impl FakePeer {
        fn new(blocks: Vec<Block>) -> Self {
            Self {
                blocks: Mutex::new(blocks),
            }
        }
    }

    impl PeerClient for FakePeer {
        async fn tip_id(&self) -> Result<Option<u64>, SyncError> {
            Ok(self.blocks.lock().unwrap().iter().map(|b| b.id).max())
        }

        async fn block_at(&self, id: u64) -> Result<Option<Block>, SyncError> {
            Ok(self
                .blocks
                .lock()
                .unwrap()
                .iter()
                .find(|b| b.id == id)
                .cloned())
        }

        async fn blocks_from(&self, from_id: u64) -> Result<Vec<Block>, SyncError> {
            Ok(self
                .blocks
                .lock()
                .unwrap()
                .iter()
                .filter(|b| b.id >= from_id)
                .cloned()
                .collect())
        }

        async fn post_block(&self, block: &Block, _sent_node: Option<&str>) -> Result<(), SyncError> {
            self.blocks.lock().unwrap().push(block.clone());
            Ok(())
        }

        async fn post_move(&self, _mv: &Move, _sent_node: Option<&str>) -> Result<(), SyncError> {
            Ok(())
        }
    }

    fn chain(n: u64) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut prev = None;
        for id in 1..=n {
            let block = build_block(id, prev, vec![]);
            prev = Some(block.hash);
            blocks.push(block);
        }
        blocks
    }

    #[tokio::test]
    async fn empty_local_store_catches_up_fully() {
        let mut store = InMemoryChainStore::new();
        let peer = FakePeer::new(chain(3));

        let applied = sync_with_peer(&mut store, &peer).await.unwrap();
        assert_eq!(applied, 3);
        assert_eq!(store.tip_id(), Some(3));
    }

    #[tokio::test]
    async fn matching_local_tip_needs_no_work() {
        let mut store = InMemoryChainStore::new();
        let blocks = chain(2);
        for b in blocks.clone() {
            store.put_block(b).unwrap();
        }
        let peer = FakePeer::new(blocks);

        let applied = sync_with_peer(&mut store, &peer).await.unwrap();
        assert_eq!(applied, 0);
    }

    #[tokio::test]
    async fn diverging_tail_truncates_and_replays_from_branch_point() {
        let mut store = InMemoryChainStore::new();
        let shared = chain(2);
        for b in shared.clone() {
            store.put_block(b).unwrap();
        }
        // Local diverges at block 3.
        let local_only = build_block(3, Some(shared[1].hash), vec![]);
        store.put_block(local_only).unwrap();

        // Peer has a different, longer chain sharing blocks 1-2.
        let mut peer_chain = shared.clone();
        let mut prev = shared[1].hash;
        for id in 3..=5 {
            let block = build_block(id, Some(prev), vec![]);
            prev = block.hash;
            peer_chain.push(block);
        }
        let peer = FakePeer::new(peer_chain);

        let applied = sync_with_peer(&mut store, &peer).await.unwrap();
        assert_eq!(applied, 3);
        assert_eq!(store.tip_id(), Some(5));
    }
}
