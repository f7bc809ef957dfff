//! Error taxonomy shared across the chain crate.
//!
//! These are the "kinds" from the move/block validity contracts, given
//! concrete `thiserror` types so callers can match on them instead of
//! parsing strings.

use thiserror::Error;

pub use crate::random::RandomError;

/// A move failed its validity contract or a handler's preconditions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("move signature does not verify")]
    BadSignature,
    #[error("move id does not match its canonical hash")]
    BadId,
    #[error("move user does not match the signer's address")]
    UserAddressMismatch,
    #[error("unrecognized move name: {0}")]
    InvalidName(String),
    #[error("move is missing required detail: {0}")]
    MissingDetail(&'static str),
    #[error("move detail {0} has an invalid value")]
    InvalidDetail(&'static str),
}

/// A block failed its validity contract.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("block hash does not match its canonical encoding")]
    BadHash,
    #[error("block does not satisfy its proof-of-work difficulty")]
    InsufficientWork,
    #[error("block root_hash does not match its moves")]
    BadRootHash,
    #[error("block prev_hash does not chain to the local predecessor")]
    BrokenContinuity,
    #[error("block contains an invalid move: {0}")]
    InvalidMove(#[from] MoveError),
    #[error("block references move {0} with a mismatched block_id")]
    MoveBlockIdMismatch(String),
}

/// Persistence-layer failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("underlying storage backend error: {0}")]
    Backend(String),
    #[error("block {0} not found")]
    BlockNotFound(u64),
    #[error("move {0} not found")]
    MoveNotFound(String),
}

/// Sync-engine failure.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("peer transport error: {0}")]
    Transport(String),
    #[error("peer returned an invalid block at height {height}: {source}")]
    InvalidPeerBlock { height: u64, source: BlockError },
    #[error(transparent)]
    Store(#[from] StoreError),
}
