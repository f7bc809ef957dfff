//! `POST /moves`.

use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use chain::{ChainStore, Move, NodeRecord, ReqwestPeerClient};

use crate::state::SharedState;

#[derive(Deserialize)]
pub struct PostMoveRequest {
    #[serde(flatten)]
    pub mv: Move,
    pub sent_node: Option<String>,
}

/// `POST /moves`
///
/// Validates a signed move, drops it into the local mempool, and gossips it
/// onward to every other known peer.
pub async fn accept(
    State(state): State<SharedState>,
    Json(body): Json<PostMoveRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mv = body.mv;

    if let Err(e) = mv.validate() {
        state.metrics.chain.moves_rejected_total.inc();
        return Err((StatusCode::BAD_REQUEST, format!("invalid move: {e}")));
    }

    {
        let mut store = state.store.lock().await;
        store
            .put_unconfirmed_move(mv.clone())
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    }

    state.metrics.chain.moves_validated_total.inc();

    gossip_move(&state, &mv, body.sent_node.as_deref()).await;

    Ok(StatusCode::ACCEPTED)
}

async fn gossip_move(state: &SharedState, mv: &Move, sent_node: Option<&str>) {
    if state.peers.is_empty() {
        return;
    }

    let peers: Vec<(NodeRecord, ReqwestPeerClient)> = state
        .peers
        .iter()
        .map(|url| (NodeRecord::new(url.clone()), ReqwestPeerClient::new(url.clone())))
        .collect();

    let start = Instant::now();
    let outcomes = chain::broadcast_move(mv, &state.self_url, sent_node, &peers, |peer_url| {
        tracing::debug!(peer = peer_url, "move gossip delivered");
    })
    .await;
    state
        .metrics
        .chain
        .sync_duration_seconds
        .observe(start.elapsed().as_secs_f64());

    for outcome in outcomes {
        let kind = chain::BroadcastKind::Move.as_str();
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
            tracing::warn!(peer = outcome.peer_url, "move gossip delivery failed");
        }
    }
}
