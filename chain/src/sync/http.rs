//! Async JSON-over-HTTP [`PeerClient`](super::PeerClient) implementation.
//!
//! Wire shapes match §6 exactly: blocks and moves travel as their normal
//! serde representations, wrapped in `{"block": ...}` / `{"blocks": [...]}`
//! envelopes for the GET endpoints.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::types::{Block, Move};

use super::PeerClient;

/// Talks to a single remote node's peer HTTP surface.
pub struct ReqwestPeerClient {
    base_url: String,
    client: reqwest::Client,
}

impl ReqwestPeerClient {
    /// `base_url` should be the node's root, e.g. `"http://127.0.0.1:7878"`
    /// (no trailing slash required).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Deserialize)]
struct BlockEnvelope {
    block: Option<Block>,
}

#[derive(Deserialize)]
struct BlocksEnvelope {
    blocks: Vec<Block>,
}

#[derive(Serialize)]
struct PostBlockBody<'a> {
    #[serde(flatten)]
    block: &'a Block,
    #[serde(skip_serializing_if = "Option::is_none")]
    sent_node: Option<&'a str>,
}

#[derive(Serialize)]
struct PostMoveBody<'a> {
    #[serde(flatten)]
    mv: &'a Move,
    #[serde(skip_serializing_if = "Option::is_none")]
    sent_node: Option<&'a str>,
}

fn transport_err(url: &str, err: reqwest::Error) -> SyncError {
    SyncError::Transport(format!("request to {url} failed: {err}"))
}

impl PeerClient for ReqwestPeerClient {
    async fn tip_id(&self) -> Result<Option<u64>, SyncError> {
        let url = self.url("/blocks/last");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_err(&url, e))?;
        let envelope: BlockEnvelope = resp.json().await.map_err(|e| transport_err(&url, e))?;
        Ok(envelope.block.map(|b| b.id))
    }

    async fn block_at(&self, id: u64) -> Result<Option<Block>, SyncError> {
        let url = self.url(&format!("/blocks/{id}"));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_err(&url, e))?;
        let envelope: BlockEnvelope = resp.json().await.map_err(|e| transport_err(&url, e))?;
        Ok(envelope.block)
    }

    async fn blocks_from(&self, from_id: u64) -> Result<Vec<Block>, SyncError> {
        let url = self.url(&format!("/blocks?from={from_id}"));
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_err(&url, e))?;
        let envelope: BlocksEnvelope = resp.json().await.map_err(|e| transport_err(&url, e))?;
        Ok(envelope.blocks)
    }

    async fn post_block(&self, block: &Block, sent_node: Option<&str>) -> Result<(), SyncError> {
        let url = self.url("/blocks");
        self.client
            .post(&url)
            .json(&PostBlockBody { block, sent_node })
            .send()
            .await
            .map_err(|e| transport_err(&url, e))?;
        Ok(())
    }

    async fn post_move(&self, mv: &Move, sent_node: Option<&str>) -> Result<(), SyncError> {
        let url = self.url("/moves");
        self.client
            .post(&url)
            .json(&PostMoveBody { mv, sent_node })
            .send()
            .await
            .map_err(|e| transport_err(&url, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_without_double_slashes() {
        let client = ReqwestPeerClient::new("http://127.0.0.1:7878/");
        assert_eq!(client.url("/blocks/last"), "http://127.0.0.1:7878/blocks/last");
        assert_eq!(client.url("blocks/last"), "http://127.0.0.1:7878/blocks/last");
    }
}
