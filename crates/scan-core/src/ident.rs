// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and hashing utilities.
//!
//! All content-addressed identifiers in this workspace (decision hashes,
//! trace/scene ids, provenance chain links, signed-log payload hashes) are
//! SHA-256 over an explicit, versioned byte layout — never a language-level
//! `Hash`/`Debug` derive, and never a hash of a non-canonical encoding such
//! as default JSON map iteration order.

use sha2::{Digest, Sha256};

/// Canonical 256-bit hash used throughout the workspace for content
/// addressing: decision hashes, trace/scene ids, provenance links.
pub type Hash = [u8; 32];

/// Hashes `bytes` with SHA-256 and returns the raw 32-byte digest.
#[must_use]
pub fn sha256(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Hashes the concatenation of several byte slices with SHA-256, without
/// materializing the concatenation. Domain separation between fields is the
/// caller's responsibility (see [`crate::canonical`] for length-prefixed
/// layouts).
#[must_use]
pub fn sha256_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Renders a [`Hash`] as 64 lowercase hex characters, the wire format
/// required for `traceId`, `sceneId`, and `policyHash` (§3).
#[must_use]
pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Parses 64 lowercase hex characters back into a [`Hash`].
///
/// Returns `None` if the input is not exactly 64 lowercase-hex characters
/// decoding to 32 bytes (uppercase hex is rejected; the wire format is
/// lowercase-only per §3).
#[must_use]
pub fn from_hex(s: &str) -> Option<Hash> {
    if s.len() != 64
        || !s
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return None;
    }
    let bytes = hex::decode(s).ok()?;
    bytes.try_into().ok()
}

/// The SHA-256 digest of the empty byte string.
///
/// Used as the canonical previous-hash sentinel for the first entry of a
/// hash chain (`ProvenanceChain`, signed audit log).
#[must_use]
pub fn zero_hash() -> Hash {
    sha256(&[])
}
