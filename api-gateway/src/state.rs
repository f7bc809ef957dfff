//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use chain::{Address, MetricsRegistry, ReconstructorCache, RocksDbChainStore};

/// Shared state held by the API and background tasks.
///
/// This is wrapped in an [`Arc`] and passed to request handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// Embedded chain store (RocksDB-backed). Serialized behind a single
    /// lock so mining, sync, and incoming HTTP requests never interleave
    /// writes.
    pub store: Mutex<RocksDbChainStore>,
    /// This node's own externally reachable URL, stamped on outbound
    /// gossip for loop suppression.
    pub self_url: String,
    /// Known peer URLs to gossip newly accepted blocks/moves to.
    pub peers: Vec<String>,
    /// Identity the mining loop mints blocks under.
    pub miner_address: Address,
    /// Memoizing avatar reconstructor cache.
    pub reconstructor: ReconstructorCache,
    /// Metrics registry shared between the node and the API.
    pub metrics: Arc<MetricsRegistry>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
