//! Peer node record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A known peer, keyed by its URL.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeRecord {
    pub url: String,
    pub last_connected_at: Option<DateTime<Utc>>,
}

impl NodeRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            last_connected_at: None,
        }
    }

    pub fn mark_contacted(&mut self, at: DateTime<Utc>) {
        self.last_connected_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_has_no_contact_history() {
        let node = NodeRecord::new("http://peer.example:8081");
        assert!(node.last_connected_at.is_none());
    }

    #[test]
    fn mark_contacted_updates_timestamp() {
        let mut node = NodeRecord::new("http://peer.example:8081");
        let now = Utc::now();
        node.mark_contacted(now);
        assert_eq!(node.last_connected_at, Some(now));
    }
}
