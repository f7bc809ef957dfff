//! Object broadcast with loop suppression.
//!
//! Broadcasting a block or move to the known peer set skips whichever peer
//! originally sent it (when known) and tolerates individual transport
//! failures, continuing with the remaining peers.

use crate::sync::PeerClient;
use crate::types::{Block, Move, NodeRecord};

/// What kind of object is being broadcast, for metrics labeling.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BroadcastKind {
    Block,
    Move,
}

impl BroadcastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastKind::Block => "block",
            BroadcastKind::Move => "move",
        }
    }
}

/// Outcome of broadcasting to a single peer.
pub struct PeerOutcome {
    pub peer_url: String,
    pub succeeded: bool,
}

/// Broadcasts `block` to every peer in `peers` except `sender_url` (loop
/// suppression). Peers that succeed have their [`NodeRecord::last_connected_at`]
/// marked via `on_contacted`.
pub async fn broadcast_block<P, F>(
    block: &Block,
    self_url: &str,
    sender_url: Option<&str>,
    peers: &[(NodeRecord, P)],
    mut on_contacted: F,
) -> Vec<PeerOutcome>
where
    P: PeerClient,
    F: FnMut(&str),
{
    let mut outcomes = Vec::new();
    for (node, client) in peers {
        if Some(node.url.as_str()) == sender_url {
            continue;
        }
        let result = client.post_block(block, Some(self_url)).await;
        if result.is_ok() {
            on_contacted(&node.url);
        }
        outcomes.push(PeerOutcome {
            peer_url: node.url.clone(),
            succeeded: result.is_ok(),
        });
    }
    outcomes
}

/// Broadcasts `mv` to every peer in `peers` except `sender_url`.
pub async fn broadcast_move<P, F>(
    mv: &Move,
    self_url: &str,
    sender_url: Option<&str>,
    peers: &[(NodeRecord, P)],
    mut on_contacted: F,
) -> Vec<PeerOutcome>
where
    P: PeerClient,
    F: FnMut(&str),
{
    let mut outcomes = Vec::new();
    for (node, client) in peers {
        if Some(node.url.as_str()) == sender_url {
            continue;
        }
        let result = client.post_move(mv, Some(self_url)).await;
        if result.is_ok() {
            on_contacted(&node.url);
        }
        outcomes.push(PeerOutcome {
            peer_url: node.url.clone(),
            succeeded: result.is_ok(),
        });
    }
    outcomes
}
