// src/main.rs
//
// Minimal demo node that wires up the chain library:
//
// - RocksDB-backed storage
// - Prometheus metrics exporter on /metrics
// - A mining loop that mints blocks from the local mempool on a fixed
//   cadence, adjusting difficulty as it goes
// - A sync loop that periodically catches up against configured peers

use std::sync::Arc;

use tokio::sync::Mutex;

use chain::{
    Address, MetricsRegistry, NodeConfig, ReqwestPeerClient, RocksDbChainStore, miner,
    run_prometheus_http_server, sync_with_peer,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "chain=info".to_string()))
        .init();

    if let Err(err) = run_node().await {
        tracing::error!("fatal error: {err}");
        std::process::exit(1);
    }
}

async fn run_node() -> Result<(), String> {
    let cfg = NodeConfig::default();

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    let store = RocksDbChainStore::open(&cfg.storage).map_err(|e| {
        format!("failed to open RocksDB store at {}: {e}", cfg.storage.path)
    })?;
    let store = Arc::new(Mutex::new(store));

    // In a real deployment the miner's identity is loaded from a secured
    // passphrase/keyfile. The demo node derives one deterministically so a
    // fresh checkout mines immediately.
    let creator = Address::from_pubkey(&chain::crypto::passphrase_to_pubkey("demo-node-identity"));

    let mining_store = store.clone();
    let mining_metrics = metrics.clone();
    let mining_creator = creator.clone();
    let cadence = cfg.mining.cadence;
    tokio::spawn(async move {
        run_mining_loop(mining_store, mining_creator, mining_metrics, cadence).await;
    });

    let sync_store = store.clone();
    let sync_metrics = metrics.clone();
    let peers = cfg.peers.seed_peers.clone();
    let sync_interval = cfg.peers.sync_interval;
    tokio::spawn(async move {
        run_sync_loop(sync_store, peers, sync_metrics, sync_interval).await;
    });

    tracing::info!(creator = %creator, "node started");

    // Park the main task; the mining and sync loops run in the background
    // until the process receives a termination signal.
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    Ok(())
}

async fn run_mining_loop(
    store: Arc<Mutex<RocksDbChainStore>>,
    creator: Address,
    metrics: Arc<MetricsRegistry>,
    cadence: std::time::Duration,
) {
    loop {
        let start = std::time::Instant::now();
        let now = chrono::Utc::now();

        let outcome = {
            let mut store = store.lock().await;
            miner::mine_block(&mut *store, creator.clone(), now)
        };

        match outcome {
            Ok(miner::MineOutcome::Minted(block)) => {
                let elapsed = start.elapsed().as_secs_f64();
                metrics.chain.mining_duration_seconds.observe(elapsed);
                metrics.chain.blocks_mined_total.inc();
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

async fn run_sync_loop(
    store: Arc<Mutex<RocksDbChainStore>>,
    peers: Vec<String>,
    metrics: Arc<MetricsRegistry>,
    interval: std::time::Duration,
) {
    if peers.is_empty() {
        tracing::info!("no seed peers configured; sync loop idle");
        return;
    }

    loop {
        for peer_url in &peers {
            let client = ReqwestPeerClient::new(peer_url.clone());
            let start = std::time::Instant::now();
            let result = {
                let mut store = store.lock().await;
                sync_with_peer(&mut *store, &client).await
            };
            let elapsed = start.elapsed().as_secs_f64();
            metrics.chain.sync_duration_seconds.observe(elapsed);

            match result {
                Ok(applied) => {
                    metrics.chain.sync_branch_point_depth.set(applied as i64);
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
