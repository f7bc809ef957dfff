//! Move model: signed player actions.
//!
//! A move is the only unit of state change in the game. It is created by a
//! player, signed, optionally confirmed into a block, and then replayed by
//! [`crate::reconstructor`] to rebuild an [`crate::types::Avatar`].

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::Value;
use crate::crypto;
use crate::error::MoveError;

use super::{Address, Hash256, SignatureField, created_at_format};

/// The fixed set of move variants the chain understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveName {
    CreateNovice,
    HackAndSlash,
    Sleep,
    LevelUp,
    Say,
    Send,
    Combine,
    Sell,
    Buy,
}

impl MoveName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveName::CreateNovice => "create_novice",
            MoveName::HackAndSlash => "hack_and_slash",
            MoveName::Sleep => "sleep",
            MoveName::LevelUp => "level_up",
            MoveName::Say => "say",
            MoveName::Send => "send",
            MoveName::Combine => "combine",
            MoveName::Sell => "sell",
            MoveName::Buy => "buy",
        }
    }

    /// `true` for the move variants that can materialize a fresh avatar.
    pub fn is_creation(&self) -> bool {
        matches!(self, MoveName::CreateNovice)
    }
}

impl FromStr for MoveName {
    type Err = MoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "create_novice" => MoveName::CreateNovice,
            "hack_and_slash" => MoveName::HackAndSlash,
            "sleep" => MoveName::Sleep,
            "level_up" => MoveName::LevelUp,
            "say" => MoveName::Say,
            "send" => MoveName::Send,
            "combine" => MoveName::Combine,
            "sell" => MoveName::Sell,
            "buy" => MoveName::Buy,
            other => return Err(MoveError::InvalidName(other.to_string())),
        })
    }
}

/// Free-form move parameters, keyed by name (e.g. `"strength"`,
/// `"item_name"`, `"amount"`). Backed by a `BTreeMap` so canonical
/// serialization never depends on insertion order.
pub type MoveDetails = BTreeMap<String, String>;

/// A signed player move, confirmed or still sitting in the mempool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Move {
    pub id: Hash256,
    pub user: Address,
    pub name: MoveName,
    #[serde(default)]
    pub details: MoveDetails,
    pub signature: SignatureField,
    #[serde(default)]
    pub tax: u64,
    #[serde(with = "created_at_format")]
    pub created_at: DateTime<Utc>,
    pub block_id: Option<u64>,
}

impl Move {
    /// Canonical value over the fields covered by the signature.
    fn signing_value(
        user: &Address,
        name: MoveName,
        details: &MoveDetails,
        tax: u64,
        created_at: &DateTime<Utc>,
    ) -> Value {
        let details_value = Value::Dict(
            details
                .iter()
                .map(|(k, v)| (k.as_bytes().to_vec(), Value::str(v.clone())))
                .collect(),
        );

        Value::dict()
            .entry("user", Value::str(user.0.clone()))
            .entry("name", Value::str(name.as_str()))
            .entry("details", details_value)
            .entry("tax", Value::Int(tax as i64))
            .entry(
                "created_at",
                Value::str(created_at.format(created_at_format::FORMAT).to_string()),
            )
            .build()
    }

    /// Signs a new move, deriving `user` and `signature` from `passphrase`.
    pub fn create_signed(
        passphrase: &str,
        name: MoveName,
        details: MoveDetails,
        tax: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        let pubkey = crypto::passphrase_to_pubkey(passphrase);
        let user = Address::from_pubkey(&pubkey);

        let payload = Self::signing_value(&user, name, &details, tax, &created_at).encode();
        let signature = crypto::sign(&payload, passphrase);

        let id_value = Value::dict()
            .entry("user", Value::str(user.0.clone()))
            .entry("name", Value::str(name.as_str()))
            .entry(
                "details",
                Value::Dict(
                    details
                        .iter()
                        .map(|(k, v)| (k.as_bytes().to_vec(), Value::str(v.clone())))
                        .collect(),
                ),
            )
            .entry("tax", Value::Int(tax as i64))
            .entry(
                "created_at",
                Value::str(created_at.format(created_at_format::FORMAT).to_string()),
            )
            .entry("signature", Value::str(signature.to_wire_string()))
            .build();
        let id = Hash256::compute(&id_value.encode());

        Move {
            id,
            user,
            name,
            details,
            signature: SignatureField(signature),
            tax,
            created_at,
            block_id: None,
        }
    }

    /// Recomputes this move's id from its current fields plus signature.
    pub fn compute_id(&self) -> Hash256 {
        let value = Value::dict()
            .entry("user", Value::str(self.user.0.clone()))
            .entry("name", Value::str(self.name.as_str()))
            .entry(
                "details",
                Value::Dict(
                    self.details
                        .iter()
                        .map(|(k, v)| (k.as_bytes().to_vec(), Value::str(v.clone())))
                        .collect(),
                ),
            )
            .entry("tax", Value::Int(self.tax as i64))
            .entry(
                "created_at",
                Value::str(self.created_at.format(created_at_format::FORMAT).to_string()),
            )
            .entry("signature", Value::str(self.signature.0.to_wire_string()))
            .build();
        Hash256::compute(&value.encode())
    }

    /// Full validity contract: id matches hash, signature verifies, and the
    /// signer's address matches the claimed user.
    pub fn validate(&self) -> Result<(), MoveError> {
        if self.compute_id() != self.id {
            return Err(MoveError::BadId);
        }

        let payload =
            Self::signing_value(&self.user, self.name, &self.details, self.tax, &self.created_at)
                .encode();
        if !crypto::verify(&payload, &self.signature.0) {
            return Err(MoveError::BadSignature);
        }

        let expected_user = Address::from_pubkey(&self.signature.0.pubkey);
        if expected_user != self.user {
            return Err(MoveError::UserAddressMismatch);
        }

        Ok(())
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(|s| s.as_str())
    }
}
