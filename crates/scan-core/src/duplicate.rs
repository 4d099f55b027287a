// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Duplicate detection (§4.2).
//!
//! Signature computation is a pure function of a candidate and the SSOT
//! constants; only duplicate *membership* (has this exact signature been
//! seen this session) is stateful, and that state lives in
//! [`DuplicateDetector`], never in the signature function itself.
//!
//! Rounding is `f64::round` (round-half-away-from-zero) everywhere in this
//! module — chosen once, fixed for good, so signatures are byte-stable
//! across platforms (see `SPEC_FULL.md`'s Open Question resolution).

use rustc_hash::FxHashSet;

use crate::config::SsotConstants;
use crate::ident::{sha256, Hash};
use crate::model::PatchCandidate;

fn quantize_clamped(v: f64, quantum: f64) -> u8 {
    let binned = (v / quantum).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = binned.clamp(0.0, 255.0) as u8;
    clamped
}

fn quantize_signed(v: f64, quantum: f64) -> i32 {
    let binned = (v / quantum).round();
    #[allow(clippy::cast_possible_truncation)]
    let result = binned.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
    result
}

/// Computes a candidate's duplicate-detection signature: SHA-256 over the
/// byte concatenation of its pose bins, coverage-cell bins, and radiance
/// bins, in that fixed order.
#[must_use]
pub fn signature(candidate: &PatchCandidate, constants: &SsotConstants) -> Hash {
    let mut buf = Vec::with_capacity(3 + 8 + 3);
    for v in candidate.pose {
        buf.push(quantize_clamped(v, constants.fixed.pose_eps));
    }
    for v in candidate.coverage_cell {
        let binned = quantize_signed(f64::from(v), constants.fixed.coverage_cell_size);
        buf.extend_from_slice(&binned.to_be_bytes());
    }
    for v in candidate.radiance {
        buf.push(quantize_clamped(v * constants.fixed.radiance_binning, 1.0));
    }
    sha256(&buf)
}

/// Session-scoped set of signatures already observed. Runs strictly before
/// any SOFT/HARD capacity check in the admission pipeline (§4.2, §4.3).
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    seen: FxHashSet<Hash>,
}

impl DuplicateDetector {
    /// Constructs an empty detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `candidate`'s signature has already been recorded,
    /// without mutating the seen-set. Use when a caller needs to know
    /// duplicate status without committing to recording it yet.
    #[must_use]
    pub fn is_duplicate(&self, candidate: &PatchCandidate, constants: &SsotConstants) -> bool {
        self.seen.contains(&signature(candidate, constants))
    }

    /// Checks duplicate status and records the signature unconditionally
    /// (whether or not it was already present). Returns `true` if this
    /// exact signature had already been seen.
    pub fn check_and_record(
        &mut self,
        candidate: &PatchCandidate,
        constants: &SsotConstants,
    ) -> bool {
        let sig = signature(candidate, constants);
        !self.seen.insert(sig)
    }

    /// Number of distinct signatures recorded this session.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no signatures have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(pose: [f64; 3]) -> PatchCandidate {
        PatchCandidate::new(uuid::Uuid::nil(), pose, [0, 0], [0.5, 0.5, 0.5])
    }

    #[test]
    fn identical_candidates_share_a_signature() {
        let constants = SsotConstants::standard();
        let a = candidate([1.0, 2.0, 3.0]);
        let b = candidate([1.0, 2.0, 3.0]);
        assert_eq!(signature(&a, &constants), signature(&b, &constants));
    }

    #[test]
    fn pose_within_same_quantum_collides() {
        let constants = SsotConstants::standard();
        let eps = constants.fixed.pose_eps;
        let a = candidate([1.0, 2.0, 3.0]);
        let b = candidate([1.0 + eps * 0.01, 2.0, 3.0]);
        assert_eq!(signature(&a, &constants), signature(&b, &constants));
    }

    #[test]
    fn detector_flags_second_identical_submission() {
        let constants = SsotConstants::standard();
        let mut detector = DuplicateDetector::new();
        let c1 = candidate([1.0, 2.0, 3.0]);
        let c2 = candidate([1.0, 2.0, 3.0]);
        assert!(!detector.check_and_record(&c1, &constants));
        assert!(detector.check_and_record(&c2, &constants));
        assert_eq!(detector.len(), 1);
    }

    #[test]
    fn distinct_radiance_changes_signature() {
        let constants = SsotConstants::standard();
        let a = candidate([1.0, 2.0, 3.0]);
        let mut b = candidate([1.0, 2.0, 3.0]);
        b.radiance = [0.9, 0.1, 0.1];
        assert_ne!(signature(&a, &constants), signature(&b, &constants));
    }
}
