//! Prometheus-backed metrics and HTTP exporter.
//!
//! Defines a [`MetricsRegistry`] owning a Prometheus registry and the node's
//! metrics, plus an async HTTP exporter that serves `/metrics` using
//! `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Node-level Prometheus metrics: mining, move validation, sync, and
/// gossip.
#[derive(Clone)]
pub struct ChainMetrics {
    pub mining_duration_seconds: Histogram,
    pub blocks_mined_total: IntCounter,
    pub moves_validated_total: IntCounter,
    pub moves_rejected_total: IntCounter,
    pub sync_duration_seconds: Histogram,
    pub sync_branch_point_depth: IntGauge,
    pub gossip_broadcast_total: IntCounterVec,
    pub gossip_broadcast_failures_total: IntCounterVec,
}

impl ChainMetrics {
    /// Registers every chain metric into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let mining_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "mining_duration_seconds",
                "Wall-clock time spent minting a single block's proof-of-work",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;
        registry.register(Box::new(mining_duration_seconds.clone()))?;

        let blocks_mined_total = IntCounter::with_opts(Opts::new(
            "blocks_mined_total",
            "Total number of blocks successfully minted and persisted locally",
        ))?;
        registry.register(Box::new(blocks_mined_total.clone()))?;

        let moves_validated_total = IntCounter::with_opts(Opts::new(
            "moves_validated_total",
            "Total number of moves that passed validation",
        ))?;
        registry.register(Box::new(moves_validated_total.clone()))?;

        let moves_rejected_total = IntCounter::with_opts(Opts::new(
            "moves_rejected_total",
            "Total number of moves rejected by validation",
        ))?;
        registry.register(Box::new(moves_rejected_total.clone()))?;

        let sync_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "sync_duration_seconds",
                "Wall-clock time spent syncing against a single peer",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(sync_duration_seconds.clone()))?;

        let sync_branch_point_depth = IntGauge::with_opts(Opts::new(
            "sync_branch_point_depth",
            "Number of local blocks truncated by the most recent sync's branch-point probe",
        ))?;
        registry.register(Box::new(sync_branch_point_depth.clone()))?;

        let gossip_broadcast_total = IntCounterVec::new(
            Opts::new(
                "gossip_broadcast_total",
                "Total number of per-peer gossip broadcast attempts",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(gossip_broadcast_total.clone()))?;

        let gossip_broadcast_failures_total = IntCounterVec::new(
            Opts::new(
                "gossip_broadcast_failures_total",
                "Total number of per-peer gossip broadcast attempts that failed",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(gossip_broadcast_failures_total.clone()))?;

        Ok(Self {
            mining_duration_seconds,
            blocks_mined_total,
            moves_validated_total,
            moves_rejected_total,
            sync_duration_seconds,
            sync_branch_point_depth,
            gossip_broadcast_total,
            gossip_broadcast_failures_total,
        })
    }
}

/// Wrapper around a Prometheus registry and the chain's metrics. Wrap in an
/// [`Arc`] and share across tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub chain: ChainMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the chain metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("game_chain".to_string()), None)?;
        let chain = ChainMetrics::register(&registry)?;
        Ok(Self { registry, chain })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            eprintln!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// Listens on `addr` and serves `GET /metrics` with the Prometheus text
/// exposition format; all other paths return 404.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                eprintln!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = ChainMetrics::register(&registry).expect("register metrics");

        metrics.mining_duration_seconds.observe(0.123);
        metrics.blocks_mined_total.inc();
        metrics.moves_validated_total.inc_by(3);
        metrics.gossip_broadcast_total.with_label_values(&["block"]).inc();

        let metric_families = registry.gather();
        assert!(!metric_families.is_empty());
    }

    #[test]
    fn metrics_registry_gather_text_works() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.chain.blocks_mined_total.inc();
        let text = registry.gather_text();
        assert!(text.contains("blocks_mined_total"));
    }
}
