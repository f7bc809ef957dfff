//! Chain library crate.
//!
//! This crate provides the core building blocks for a small proof-of-work
//! game blockchain:
//!
//! - canonical serialization and hashing (`canonical`),
//! - Ed25519 signing and address derivation (`crypto`),
//! - hashcash proof-of-work (`hashcash`),
//! - the hash-seeded random stream and dice notation (`random`),
//! - strongly-typed domain types: moves, blocks, avatars (`types`),
//! - deterministic move execution, combat, and crafting (`execution`),
//! - storage backends (`store`),
//! - block production (`miner`),
//! - peer synchronization (`sync`),
//! - object broadcast (`gossip`),
//! - avatar replay from move history (`reconstructor`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! Higher-level binaries (e.g. `api-gateway`) compose these pieces into a
//! running node.

pub mod canonical;
pub mod config;
pub mod crypto;
pub mod error;
pub mod execution;
pub mod gossip;
pub mod hashcash;
pub mod metrics;
pub mod miner;
pub mod random;
pub mod reconstructor;
pub mod store;
pub mod sync;
pub mod types;

// Re-export top-level configuration types.
pub use config::{MetricsConfig, MiningConfig, NodeConfig, PeerConfig};

// Re-export the error taxonomy.
pub use error::{BlockError, MoveError, RandomError, StoreError, SyncError};

// Re-export storage backends.
pub use store::{ChainStore, InMemoryChainStore, RocksDbChainStore, RocksDbConfig};

// Re-export move execution.
pub use execution::{BattleLogEntry, BattleOutcome, MoveResult, default_monster_table};

// Re-export sync and gossip interfaces.
pub use gossip::{BroadcastKind, broadcast_block, broadcast_move};
pub use sync::{PeerClient, ReqwestPeerClient, sync_with_peer};

// Re-export the avatar reconstructor.
pub use reconstructor::{ReconstructorCache, reconstruct};

// Re-export metrics registry.
pub use metrics::{ChainMetrics, MetricsRegistry, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;
