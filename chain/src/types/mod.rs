//! Core domain types used by the chain.
//!
//! This module defines strongly-typed hashes, addresses, and the move/block
//! data model shared across the chain implementation. The goal is to avoid
//! "naked" byte buffers and strings in public APIs and instead use
//! domain-specific newtypes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod avatar;
pub mod block;
pub mod mov;
pub mod node;

pub use avatar::{Avatar, AvatarClass, Novice};
pub use block::Block;
pub use mov::{Move, MoveDetails, MoveName};
pub use node::NodeRecord;

/// Shared `created_at` wire format, used by both [`Move`] and [`Block`]:
/// `"YYYY-MM-DD HH:MM:SS.ffffff"`.
pub(crate) mod created_at_format {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        Utc.datetime_from_str(&raw, FORMAT)
            .map_err(serde::de::Error::custom)
    }
}

/// Length in bytes of all 256-bit hashes used in this module.
pub const HASH_LEN: usize = 32;

/// Strongly-typed 256-bit SHA-256 hash, displayed and serialized as a
/// lowercase hex string to match the wire protocol.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the SHA-256 hash of `data`.
    pub fn compute(data: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(&digest);
        Hash256(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; HASH_LEN] = bytes.try_into().ok()?;
        Some(Hash256(arr))
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash256::from_hex(&s).ok_or_else(|| serde::de::Error::custom("invalid hex hash"))
    }
}

/// A player address: the base58 encoding of their Ed25519 public key.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn from_pubkey(pubkey: &[u8; 32]) -> Self {
        Address(crate::crypto::address_of(pubkey))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Detached signature plus embedded public key, as carried on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignatureField(pub crate::crypto::DetachedSignature);

impl Serialize for SignatureField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_wire_string())
    }
}

impl<'de> Deserialize<'de> for SignatureField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::crypto::DetachedSignature::parse(&s)
            .map(SignatureField)
            .ok_or_else(|| serde::de::Error::custom("invalid signature wire format"))
    }
}
