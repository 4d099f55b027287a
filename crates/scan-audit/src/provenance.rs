// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! SHA-chained coverage-state transition log (§4.9).

use scan_core::ident::{sha256, zero_hash, Hash};

/// One coverage-state transition, linked to its predecessor by hash.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceEntry {
    /// Wall-clock time of the transition, in milliseconds. Carried for
    /// audit only — never consulted by any decision function (§5).
    pub timestamp_millis: u64,
    /// State name transitioned from.
    pub from_state: String,
    /// State name transitioned to.
    pub to_state: String,
    /// Quantized coverage figure at the time of transition.
    pub coverage_quantized: u32,
    /// Per-level (`L0..L6`) coverage breakdown.
    pub level_breakdown: [f64; 7],
    /// Count of privacy-impact-zones in effect.
    pub piz_count: u32,
    /// Total area, in square meters, covered by privacy-impact-zones.
    pub piz_total_area_sq_m: f64,
    /// Area, in square meters, excluded from coverage by privacy-impact-zones.
    pub piz_excluded_area_sq_m: f64,
    /// Content digest of the evidence grid at the time of transition.
    pub grid_digest: Hash,
    /// Content digest of the active policy/profile.
    pub policy_digest: Hash,
    /// Hash of the previous entry (`zero_hash()` for the first entry).
    pub prev_hash: Hash,
    /// `SHA-256(preimage)` of this entry, chaining it to `prev_hash`.
    pub hash: Hash,
}

/// Appends the fields of one transition into the canonical preimage
/// (field order fixed per §4.9), separating each field with the ASCII unit
/// separator (`0x1F`) and length-prefixing the two variable-length string
/// fields (`fromState`, `toState`) with a little-endian `u32` — the scheme
/// chosen for every hash-chained preimage in this workspace so that no byte
/// sequence inside one field can be mistaken for a field boundary.
fn preimage(entry_without_hash: &ProvenanceEntry) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&entry_without_hash.timestamp_millis.to_be_bytes());
    push_str(&mut buf, &entry_without_hash.from_state);
    push_str(&mut buf, &entry_without_hash.to_state);
    buf.push(0x1F);
    buf.extend_from_slice(&entry_without_hash.coverage_quantized.to_be_bytes());
    buf.push(0x1F);
    for level in entry_without_hash.level_breakdown {
        buf.extend_from_slice(&level.to_be_bytes());
    }
    buf.push(0x1F);
    buf.extend_from_slice(&entry_without_hash.piz_count.to_be_bytes());
    buf.push(0x1F);
    buf.extend_from_slice(&entry_without_hash.piz_total_area_sq_m.to_be_bytes());
    buf.push(0x1F);
    buf.extend_from_slice(&entry_without_hash.piz_excluded_area_sq_m.to_be_bytes());
    buf.push(0x1F);
    buf.extend_from_slice(&entry_without_hash.grid_digest);
    buf.push(0x1F);
    buf.extend_from_slice(&entry_without_hash.policy_digest);
    buf.push(0x1F);
    buf.extend_from_slice(&entry_without_hash.prev_hash);
    buf
}

fn push_str(buf: &mut Vec<u8>, s: &str) {
    buf.push(0x1F);
    #[allow(clippy::cast_possible_truncation)]
    let len = s.len() as u32;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Fields of a transition the caller supplies; `prevHash` and `hash` are
/// computed by [`ProvenanceChain::append`], not provided.
#[derive(Debug, Clone)]
pub struct TransitionInput {
    /// See [`ProvenanceEntry::timestamp_millis`].
    pub timestamp_millis: u64,
    /// See [`ProvenanceEntry::from_state`].
    pub from_state: String,
    /// See [`ProvenanceEntry::to_state`].
    pub to_state: String,
    /// See [`ProvenanceEntry::coverage_quantized`].
    pub coverage_quantized: u32,
    /// See [`ProvenanceEntry::level_breakdown`].
    pub level_breakdown: [f64; 7],
    /// See [`ProvenanceEntry::piz_count`].
    pub piz_count: u32,
    /// See [`ProvenanceEntry::piz_total_area_sq_m`].
    pub piz_total_area_sq_m: f64,
    /// See [`ProvenanceEntry::piz_excluded_area_sq_m`].
    pub piz_excluded_area_sq_m: f64,
    /// See [`ProvenanceEntry::grid_digest`].
    pub grid_digest: Hash,
    /// See [`ProvenanceEntry::policy_digest`].
    pub policy_digest: Hash,
}

/// Append-only, hash-chained log of coverage-state transitions (§4.9).
#[derive(Debug, Clone, Default)]
pub struct ProvenanceChain {
    entries: Vec<ProvenanceEntry>,
}

impl ProvenanceChain {
    /// Constructs an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends `input` as the next entry, linking it to the previous
    /// entry's hash (or `zero_hash()` if this is the first entry).
    pub fn append(&mut self, input: TransitionInput) -> &ProvenanceEntry {
        let prev_hash = self.entries.last().map_or_else(zero_hash, |e| e.hash);
        let mut entry = ProvenanceEntry {
            timestamp_millis: input.timestamp_millis,
            from_state: input.from_state,
            to_state: input.to_state,
            coverage_quantized: input.coverage_quantized,
            level_breakdown: input.level_breakdown,
            piz_count: input.piz_count,
            piz_total_area_sq_m: input.piz_total_area_sq_m,
            piz_excluded_area_sq_m: input.piz_excluded_area_sq_m,
            grid_digest: input.grid_digest,
            policy_digest: input.policy_digest,
            prev_hash,
            hash: zero_hash(),
        };
        entry.hash = sha256(&preimage(&entry));
        self.entries.push(entry);
        self.entries.last().expect("just pushed")
    }

    /// All entries, in append order.
    #[must_use]
    pub fn entries(&self) -> &[ProvenanceEntry] {
        &self.entries
    }

    /// Recomputes every entry's hash from its fields and `prevHash`,
    /// returning `false` at the first mismatch (or `true` for an empty or
    /// fully-consistent chain).
    #[must_use]
    pub fn verify(&self) -> bool {
        let mut expected_prev = zero_hash();
        for entry in &self.entries {
            if entry.prev_hash != expected_prev {
                return false;
            }
            if sha256(&preimage(entry)) != entry.hash {
                return false;
            }
            expected_prev = entry.hash;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: u64) -> TransitionInput {
        TransitionInput {
            timestamp_millis: ts,
            from_state: "scanning".to_string(),
            to_state: "reviewing".to_string(),
            coverage_quantized: 500,
            level_breakdown: [0.0, 0.2, 0.5, 0.7, 0.8, 0.9, 1.0],
            piz_count: 0,
            piz_total_area_sq_m: 0.0,
            piz_excluded_area_sq_m: 0.0,
            grid_digest: [1u8; 32],
            policy_digest: [2u8; 32],
        }
    }

    #[test]
    fn first_entry_links_to_zero_hash() {
        let mut chain = ProvenanceChain::new();
        chain.append(sample(1));
        assert_eq!(chain.entries()[0].prev_hash, zero_hash());
    }

    #[test]
    fn chain_verifies_after_multiple_appends() {
        let mut chain = ProvenanceChain::new();
        chain.append(sample(1));
        chain.append(sample(2));
        chain.append(sample(3));
        assert!(chain.verify());
    }

    #[test]
    fn tampering_breaks_verification() {
        let mut chain = ProvenanceChain::new();
        chain.append(sample(1));
        chain.append(sample(2));
        chain.entries[0].coverage_quantized = 999;
        assert!(!chain.verify());
    }

    #[test]
    fn identical_inputs_produce_identical_hashes() {
        let mut a = ProvenanceChain::new();
        a.append(sample(1));
        let mut b = ProvenanceChain::new();
        b.append(sample(1));
        assert_eq!(a.entries()[0].hash, b.entries()[0].hash);
    }
}
