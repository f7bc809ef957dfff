// api-gateway/src/main.rs

//! API gateway binary.
//!
//! This binary exposes a small HTTP API on top of the `chain` crate:
//!
//! - `GET /health`
//! - `GET /blocks/last`
//! - `GET /blocks/<id>`
//! - `GET /blocks?from=<id>`
//! - `POST /blocks`
//! - `POST /moves`
//! - `GET /avatars/<user>?at=<block_id>`
//!
//! It embeds a `RocksDbChainStore`-backed node, a background mining loop, a
//! background peer-sync loop, and a Prometheus metrics exporter on
//! `/metrics`.

mod config;
mod routes;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;
use tokio::sync::Mutex;

use chain::{
    Address, MetricsRegistry, NodeConfig, ReconstructorCache, ReqwestPeerClient,
    RocksDbChainStore, miner, run_prometheus_http_server, sync_with_peer,
};
use config::ApiConfig;
use routes::{avatars, blocks, health, moves};
use state::{AppState, SharedState};

const AVATAR_CACHE_CAPACITY: usize = 1_024;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "api_gateway=info,chain=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let api_cfg = ApiConfig::default();
    let node_cfg = NodeConfig::default();

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if node_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = node_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                eprintln!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Storage
    // ---------------------------

    let store = RocksDbChainStore::open(&node_cfg.storage).map_err(|e| {
        format!(
            "failed to open RocksDB store at {}: {e}",
            node_cfg.storage.path
        )
    })?;

    // In a real deployment the miner's identity is loaded from a secured
    // passphrase/keyfile. The demo gateway derives one deterministically so
    // a fresh checkout mines immediately.
    let miner_address =
        Address::from_pubkey(&chain::crypto::passphrase_to_pubkey("api-gateway-miner"));

    let self_url = format!("http://{}", api_cfg.listen_addr);

    // ---------------------------
    // Shared state
    // ---------------------------

    let app_state: SharedState = Arc::new(AppState {
        store: Mutex::new(store),
        self_url,
        peers: node_cfg.peers.seed_peers.clone(),
        miner_address,
        reconstructor: ReconstructorCache::new(AVATAR_CACHE_CAPACITY),
        metrics: metrics.clone(),
    });

    // ---------------------------
    // Mining loop
    // ---------------------------

    let mining_state = app_state.clone();
    let mining_cadence = node_cfg.mining.cadence;
    tokio::spawn(async move {
        run_mining_loop(mining_state, mining_cadence).await;
    });

    // ---------------------------
    // Peer sync loop
    // ---------------------------

    if !node_cfg.peers.seed_peers.is_empty() {
        let sync_state = app_state.clone();
        let sync_interval = node_cfg.peers.sync_interval;
        tokio::spawn(async move {
            run_sync_loop(sync_state, sync_interval).await;
        });
    }

    // ---------------------------
    // HTTP router
    // ---------------------------

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/blocks/last", get(blocks::last))
        .route("/blocks/{id}", get(blocks::by_id))
        .route("/blocks", get(blocks::from).post(blocks::accept))
        .route("/moves", post(moves::accept))
        .route("/avatars/{user}", get(avatars::by_user))
        .with_state(app_state);

    tracing::info!("API gateway listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    Ok(())
}

/// Background mining loop: mints a block from the local mempool on a fixed
/// cadence, adjusting difficulty as it goes.
async fn run_mining_loop(state: SharedState, cadence: std::time::Duration) {
    tracing::info!("mining loop running with cadence {:?}", cadence);

    loop {
        let start = std::time::Instant::now();
        let now = chrono::Utc::now();

        let outcome = {
            let mut store = state.store.lock().await;
            miner::mine_block(&mut *store, state.miner_address.clone(), now)
        };

        match outcome {
            Ok(miner::MineOutcome::Minted(block)) => {
                let elapsed = start.elapsed().as_secs_f64();
                state.metrics.chain.mining_duration_seconds.observe(elapsed);
                state.metrics.chain.blocks_mined_total.inc();
                tracing::info!(id = block.id, hash = %block.hash, "mined block");
            }
            Ok(miner::MineOutcome::LostRace) => {
                tracing::debug!("lost the race for the next block height");
            }
            Err(e) => {
                tracing::warn!("failed to mine block: {e}");
            }
        }

        tokio::time::sleep(cadence).await;
    }
}

/// Background sync loop: periodically catches up against every configured
/// peer using the branch-point probe.
async fn run_sync_loop(state: SharedState, interval: std::time::Duration) {
    loop {
        for peer_url in &state.peers {
            let client = ReqwestPeerClient::new(peer_url.clone());
            let start = std::time::Instant::now();
            let result = {
                let mut store = state.store.lock().await;
                sync_with_peer(&mut *store, &client).await
            };
            let elapsed = start.elapsed().as_secs_f64();
            state.metrics.chain.sync_duration_seconds.observe(elapsed);

            match result {
                Ok(applied) => {
                    state.metrics.chain.sync_branch_point_depth.set(applied as i64);
                    if applied > 0 {
                        tracing::info!(peer = %peer_url, applied, "synced new blocks");
                    }
                }
                Err(e) => {
                    tracing::warn!(peer = %peer_url, "sync failed: {e}");
                }
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
