//! Signing, verification, and address derivation.
//!
//! The chain treats the signature scheme as a pluggable primitive: every
//! other module only calls [`sign`], [`verify`], and [`address_of`]. The
//! concrete scheme here is Ed25519, but nothing outside this module assumes
//! that.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// A detached signature together with its signer's public key, exactly as
/// carried on the wire (`"<sig_hex> <pubkey_hex>"`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetachedSignature {
    pub signature: [u8; 64],
    pub pubkey: [u8; 32],
}

impl DetachedSignature {
    /// Parses the space-separated wire form `"<sig_hex> <pubkey_hex>"`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(' ');
        let sig_hex = parts.next()?;
        let pk_hex = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        let sig_bytes = hex::decode(sig_hex).ok()?;
        let pk_bytes = hex::decode(pk_hex).ok()?;
        let signature: [u8; 64] = sig_bytes.try_into().ok()?;
        let pubkey: [u8; 32] = pk_bytes.try_into().ok()?;
        Some(Self { signature, pubkey })
    }

    pub fn to_wire_string(&self) -> String {
        format!("{} {}", hex::encode(self.signature), hex::encode(self.pubkey))
    }
}

/// Derives a deterministic signing key from an arbitrary passphrase.
///
/// This mirrors the reference client's "type your passphrase, get your
/// keypair back" UX: the same passphrase always yields the same keypair, so
/// players never have to manage a key file.
pub fn passphrase_to_signing_key(passphrase: &str) -> SigningKey {
    let seed: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
    SigningKey::from_bytes(&seed)
}

/// Derives the public key bytes for a given passphrase.
pub fn passphrase_to_pubkey(passphrase: &str) -> [u8; 32] {
    passphrase_to_signing_key(passphrase).verifying_key().to_bytes()
}

/// Signs `message` with the key derived from `passphrase`.
pub fn sign(message: &[u8], passphrase: &str) -> DetachedSignature {
    let signing_key = passphrase_to_signing_key(passphrase);
    let pubkey = signing_key.verifying_key().to_bytes();
    let signature = signing_key.sign(message).to_bytes();
    DetachedSignature { signature, pubkey }
}

/// Verifies a detached signature against `message`.
pub fn verify(message: &[u8], sig: &DetachedSignature) -> bool {
    let Ok(vk) = VerifyingKey::from_bytes(&sig.pubkey) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(&sig.signature);
    vk.verify(message, &signature).is_ok()
}

/// Derives the base58 player address from raw public key bytes.
///
/// This is intentionally the whole derivation: no hashing step, matching
/// the reference implementation's `base58.encode(public_key)`.
pub fn address_of(pubkey: &[u8; 32]) -> String {
    bs58::encode(pubkey).into_string()
}
