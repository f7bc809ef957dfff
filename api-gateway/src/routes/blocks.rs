//! `GET /blocks/last`, `GET /blocks/<id>`, `GET /blocks?from=<id>`, `POST /blocks`.

use std::time::Instant;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use chain::{Block, ChainStore, NodeRecord, ReqwestPeerClient};

use crate::state::SharedState;

#[derive(Serialize)]
pub struct BlockEnvelope {
    pub block: Option<Block>,
}

#[derive(Serialize)]
pub struct BlocksEnvelope {
    pub blocks: Vec<Block>,
}

#[derive(Deserialize)]
pub struct FromQuery {
    pub from: Option<u64>,
}

#[derive(Deserialize)]
pub struct PostBlockRequest {
    #[serde(flatten)]
    pub block: Block,
    pub sent_node: Option<String>,
}

/// `GET /blocks/last`
pub async fn last(State(state): State<SharedState>) -> Json<BlockEnvelope> {
    let store = state.store.lock().await;
    Json(BlockEnvelope {
        block: store.tip(),
    })
}

/// `GET /blocks/<id>`
pub async fn by_id(State(state): State<SharedState>, Path(id): Path<u64>) -> Json<BlockEnvelope> {
    let store = state.store.lock().await;
    Json(BlockEnvelope {
        block: store.get_block_by_id(id),
    })
}

/// `GET /blocks?from=<id>`
pub async fn from(
    State(state): State<SharedState>,
    Query(q): Query<FromQuery>,
) -> Json<BlocksEnvelope> {
    let store = state.store.lock().await;
    let from_id = q.from.unwrap_or(1);
    Json(BlocksEnvelope {
        blocks: store.blocks_from(from_id),
    })
}

/// `POST /blocks`
///
/// Accepts a fully-formed block (hash, suffix, moves included). Validates
/// it, checks that it chains onto the local tip, persists it, and gossips
/// it onward to every other known peer.
pub async fn accept(
    State(state): State<SharedState>,
    Json(body): Json<PostBlockRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let block = body.block;

    block
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid block: {e}")))?;

    {
        let mut store = state.store.lock().await;
        let expected_prev = store.tip().map(|tip| tip.hash);
        let expected_id = store.tip_id().map(|id| id + 1).unwrap_or(1);

        if block.id != expected_id || block.prev_hash != expected_prev {
            return Err((
                StatusCode::CONFLICT,
                "block does not chain onto the local tip".to_string(),
            ));
        }

        store
            .put_block(block.clone())
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    }

    state.metrics.chain.blocks_mined_total.inc();

    gossip_block(&state, &block, body.sent_node.as_deref()).await;

    Ok(StatusCode::ACCEPTED)
}

async fn gossip_block(state: &SharedState, block: &Block, sent_node: Option<&str>) {
    if state.peers.is_empty() {
        return;
    }

    let peers: Vec<(NodeRecord, ReqwestPeerClient)> = state
        .peers
        .iter()
        .map(|url| (NodeRecord::new(url.clone()), ReqwestPeerClient::new(url.clone())))
        .collect();

    let start = Instant::now();
    let outcomes = chain::broadcast_block(block, &state.self_url, sent_node, &peers, |peer_url| {
        tracing::debug!(peer = peer_url, "block gossip delivered");
    })
    .await;
    state
        .metrics
        .chain
        .sync_duration_seconds
        .observe(start.elapsed().as_secs_f64());

    for outcome in outcomes {
        let kind = chain::BroadcastKind::Block.as_str();
        state
            .metrics
            .chain
            .gossip_broadcast_total
            .with_label_values(&[kind])
            .inc();
        if !outcome.succeeded {
            state
                .metrics
                .chain
                .gossip_broadcast_failures_total
                .with_label_values(&[kind])
                .inc();
            tracing::warn!(peer = outcome.peer_url, "block gossip delivery failed");
        }
    }
}
