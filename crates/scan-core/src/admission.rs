// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Admission decision pipeline (§4.3).
//!
//! [`evaluate`] is a pure function: given a candidate and a handful of
//! snapshot values, it returns an [`AdmissionDecision`] with no side effect
//! and no dependence on wall-clock time, frame counters, or thermal state.
//! Everything it needs to consult — duplicate status, tracker pressure,
//! information gain — is passed in as an already-resolved value or an
//! injected trait object; this function never reaches out to acquire state
//! itself.

use crate::config::SsotConstants;
use crate::ident::Hash;
use crate::model::{
    AdmissionDecision, BuildMode, Classification, GuidanceSignal, HardFuseTrigger, PatchCandidate,
    RejectReason,
};

/// Source of information-gain and novelty scores for a candidate, given the
/// existing coverage/patch snapshots. Kept as a trait (rather than a
/// concrete struct) because the real scoring math lives in the
/// out-of-scope perception/coverage layers (§1); this crate only consumes
/// the `[0,1]` scores it returns.
pub trait InformationGainCalculator {
    /// Information gain of `candidate` against `existing_coverage`, in `[0,1]`.
    fn info_gain(&self, candidate: &PatchCandidate, existing_coverage: &[f64]) -> f64;
    /// Novelty of `candidate` against `existing_patches`, in `[0,1]`.
    fn novelty(&self, candidate: &PatchCandidate, existing_patches: &[PatchCandidate]) -> f64;
}

/// Tracker-side facts the admission decision needs, resolved ahead of time
/// so [`evaluate`] stays a pure function of plain data (§4.3, §5 "Admission
/// decisions are pure and uncancellable").
#[derive(Debug, Clone, Copy)]
pub struct TrackerSnapshot {
    /// Set if the tracker's HARD limit is currently triggered.
    pub hard_fuse_trigger: Option<HardFuseTrigger>,
    /// Whether the tracker's SOFT limit is currently triggered.
    pub should_trigger_soft_limit: bool,
    /// Build mode in effect before this decision (used only to pick the
    /// guidance signal; the decision's own `buildMode` reflects the outcome).
    pub current_build_mode: BuildMode,
}

/// Evaluates one candidate against the fixed decision priority order (§4.3):
/// duplicate check, then HARD cap, then SOFT gain/novelty gating, then
/// accept. `decision_hash` is filled in by the caller via
/// [`crate::canonical::CanonicalEncoder`] once identity/policy context is
/// available; this function leaves it zeroed.
#[must_use]
pub fn evaluate(
    candidate: &PatchCandidate,
    is_duplicate: bool,
    existing_coverage: &[f64],
    existing_patches: &[PatchCandidate],
    tracker: TrackerSnapshot,
    gain_calculator: &dyn InformationGainCalculator,
    constants: &SsotConstants,
) -> AdmissionDecision {
    let zero_hash: Hash = [0u8; 32];

    if is_duplicate {
        return AdmissionDecision {
            candidate_id: candidate.candidate_id,
            classification: Classification::DuplicateRejected,
            reject_reason: Some(RejectReason::Duplicate),
            eeb_delta: 0.0,
            build_mode: tracker.current_build_mode,
            guidance_signal: GuidanceSignal::None,
            hard_fuse_trigger: None,
            decision_hash: zero_hash,
        };
    }

    if let Some(trigger) = tracker.hard_fuse_trigger {
        return AdmissionDecision {
            candidate_id: candidate.candidate_id,
            classification: Classification::Rejected,
            reject_reason: Some(RejectReason::HardCap),
            eeb_delta: 0.0,
            build_mode: BuildMode::Saturated,
            guidance_signal: GuidanceSignal::None,
            hard_fuse_trigger: Some(trigger),
            decision_hash: zero_hash,
        };
    }

    if tracker.should_trigger_soft_limit {
        let info_gain = gain_calculator.info_gain(candidate, existing_coverage);
        if info_gain < constants.quality.ig_min_soft {
            return AdmissionDecision {
                candidate_id: candidate.candidate_id,
                classification: Classification::Rejected,
                reject_reason: Some(RejectReason::LowGainSoft),
                eeb_delta: 0.0,
                build_mode: BuildMode::Damping,
                guidance_signal: GuidanceSignal::DirectionalAffordance,
                hard_fuse_trigger: None,
                decision_hash: zero_hash,
            };
        }
        let novelty = gain_calculator.novelty(candidate, existing_patches);
        if novelty < constants.quality.novelty_min_soft {
            return AdmissionDecision {
                candidate_id: candidate.candidate_id,
                classification: Classification::Rejected,
                reject_reason: Some(RejectReason::RedundantCoverage),
                eeb_delta: 0.0,
                build_mode: BuildMode::Damping,
                guidance_signal: GuidanceSignal::DirectionalAffordance,
                hard_fuse_trigger: None,
                decision_hash: zero_hash,
            };
        }
        return AdmissionDecision {
            candidate_id: candidate.candidate_id,
            classification: Classification::Accepted,
            reject_reason: None,
            eeb_delta: constants.state_machine.eeb_min_quantum,
            build_mode: BuildMode::Damping,
            guidance_signal: GuidanceSignal::DirectionalAffordance,
            hard_fuse_trigger: None,
            decision_hash: zero_hash,
        };
    }

    AdmissionDecision {
        candidate_id: candidate.candidate_id,
        classification: Classification::Accepted,
        reject_reason: None,
        eeb_delta: constants.state_machine.eeb_min_quantum,
        build_mode: tracker.current_build_mode,
        guidance_signal: GuidanceSignal::None,
        hard_fuse_trigger: None,
        decision_hash: zero_hash,
    }
}

/// Namespacing wrapper around [`evaluate`], named to match the component
/// this module implements (§2, §4.3). Holds no state of its own — every
/// admission decision is pure, so there is nothing to hold.
pub struct AdmissionController;

impl AdmissionController {
    /// See [`evaluate`].
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        candidate: &PatchCandidate,
        is_duplicate: bool,
        existing_coverage: &[f64],
        existing_patches: &[PatchCandidate],
        tracker: TrackerSnapshot,
        gain_calculator: &dyn InformationGainCalculator,
        constants: &SsotConstants,
    ) -> AdmissionDecision {
        evaluate(
            candidate,
            is_duplicate,
            existing_coverage,
            existing_patches,
            tracker,
            gain_calculator,
            constants,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGain(f64, f64);
    impl InformationGainCalculator for FixedGain {
        fn info_gain(&self, _c: &PatchCandidate, _cov: &[f64]) -> f64 {
            self.0
        }
        fn novelty(&self, _c: &PatchCandidate, _p: &[PatchCandidate]) -> f64 {
            self.1
        }
    }

    fn candidate() -> PatchCandidate {
        PatchCandidate::new(uuid::Uuid::nil(), [0.0, 0.0, 0.0], [0, 0], [0.0, 0.0, 0.0])
    }

    fn snapshot(hard: Option<HardFuseTrigger>, soft: bool) -> TrackerSnapshot {
        TrackerSnapshot {
            hard_fuse_trigger: hard,
            should_trigger_soft_limit: soft,
            current_build_mode: BuildMode::Normal,
        }
    }

    #[test]
    fn duplicate_short_circuits_before_hard_cap() {
        let constants = SsotConstants::standard();
        let gain = FixedGain(1.0, 1.0);
        let decision = evaluate(
            &candidate(),
            true,
            &[],
            &[],
            snapshot(Some(HardFuseTrigger::EebHard), true),
            &gain,
            &constants,
        );
        assert_eq!(decision.classification, Classification::DuplicateRejected);
        assert_eq!(decision.reject_reason, Some(RejectReason::Duplicate));
        assert_eq!(decision.eeb_delta, 0.0);
    }

    #[test]
    fn hard_cap_rejects_with_saturated_build_mode() {
        let constants = SsotConstants::standard();
        let gain = FixedGain(1.0, 1.0);
        let decision = evaluate(
            &candidate(),
            false,
            &[],
            &[],
            snapshot(Some(HardFuseTrigger::PatchCountHard), false),
            &gain,
            &constants,
        );
        assert_eq!(decision.classification, Classification::Rejected);
        assert_eq!(decision.reject_reason, Some(RejectReason::HardCap));
        assert_eq!(decision.build_mode, BuildMode::Saturated);
        assert_eq!(
            decision.hard_fuse_trigger,
            Some(HardFuseTrigger::PatchCountHard)
        );
    }

    #[test]
    fn soft_limit_low_gain_rejects() {
        let constants = SsotConstants::standard();
        let gain = FixedGain(0.0, 1.0);
        let decision = evaluate(
            &candidate(),
            false,
            &[],
            &[],
            snapshot(None, true),
            &gain,
            &constants,
        );
        assert_eq!(decision.reject_reason, Some(RejectReason::LowGainSoft));
        assert_eq!(decision.build_mode, BuildMode::Damping);
    }

    #[test]
    fn soft_limit_low_novelty_rejects() {
        let constants = SsotConstants::standard();
        let gain = FixedGain(1.0, 0.0);
        let decision = evaluate(
            &candidate(),
            false,
            &[],
            &[],
            snapshot(None, true),
            &gain,
            &constants,
        );
        assert_eq!(
            decision.reject_reason,
            Some(RejectReason::RedundantCoverage)
        );
    }

    #[test]
    fn soft_limit_passes_with_directional_guidance() {
        let constants = SsotConstants::standard();
        let gain = FixedGain(1.0, 1.0);
        let decision = evaluate(
            &candidate(),
            false,
            &[],
            &[],
            snapshot(None, true),
            &gain,
            &constants,
        );
        assert_eq!(decision.classification, Classification::Accepted);
        assert_eq!(decision.guidance_signal, GuidanceSignal::DirectionalAffordance);
        assert_eq!(decision.eeb_delta, constants.state_machine.eeb_min_quantum);
    }

    #[test]
    fn normal_mode_accepts_with_no_guidance() {
        let constants = SsotConstants::standard();
        let gain = FixedGain(1.0, 1.0);
        let decision = evaluate(
            &candidate(),
            false,
            &[],
            &[],
            snapshot(None, false),
            &gain,
            &constants,
        );
        assert_eq!(decision.classification, Classification::Accepted);
        assert_eq!(decision.guidance_signal, GuidanceSignal::None);
    }
}
