//! Top-level configuration for a chain node.
//!
//! This module aggregates configuration for:
//!
//! - mining (cadence, per-block move cap, whether to mine empty blocks),
//! - storage (RocksDB path and creation flags),
//! - peer networking (listen address, known peer URLs),
//! - metrics exporter (enable flag + listen address).
//!
//! The goal is to have a single `NodeConfig` struct that higher-level
//! binaries (`main.rs`, `api-gateway`) can construct from defaults, config
//! files, or environment variables as needed.

use std::net::SocketAddr;
use std::time::Duration;

use crate::store::RocksDbConfig;

/// Configuration for the block miner.
#[derive(Clone, Debug)]
pub struct MiningConfig {
    /// How often to attempt building a new block.
    pub cadence: Duration,
    /// Soft cap on the number of moves pulled from the mempool per block.
    pub max_moves_per_block: usize,
    /// Whether to mint a block when the mempool is empty.
    pub allow_empty_blocks: bool,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(5),
            max_moves_per_block: 10_000,
            allow_empty_blocks: true,
        }
    }
}

/// Configuration for this node's peer networking.
#[derive(Clone, Debug)]
pub struct PeerConfig {
    /// Address this node's peer HTTP surface listens on.
    pub listen_addr: SocketAddr,
    /// URLs of peers to sync and gossip with at startup.
    pub seed_peers: Vec<String>,
    /// How often to run a sync pass against known peers.
    pub sync_interval: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        let addr: SocketAddr = "127.0.0.1:7878"
            .parse()
            .expect("hard-coded peer listen address should parse");
        Self {
            listen_addr: addr,
            seed_peers: Vec::new(),
            sync_interval: Duration::from_secs(15),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a chain node.
///
/// This aggregates all the sub-configs needed to wire up a typical node:
/// mining tuning (`mining`), persistent storage (`storage`), peer
/// networking (`peers`), and the Prometheus metrics exporter (`metrics`).
#[derive(Clone, Debug, Default)]
pub struct NodeConfig {
    pub mining: MiningConfig,
    pub storage: RocksDbConfig,
    pub peers: PeerConfig,
    pub metrics: MetricsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_node_config_is_internally_consistent() {
        let cfg = NodeConfig::default();
        assert!(cfg.mining.max_moves_per_block > 0);
        assert!(cfg.metrics.enabled);
        assert!(cfg.peers.seed_peers.is_empty());
    }
}
