// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `PatchTracker`: the single-writer capacity/EEB authority (§4.4).
//!
//! Every public mutating method here is meant to execute as one
//! uninterrupted turn (§5): no `await`, no suspension, no interleaving with
//! another authority's mutation between evidence append and the
//! post-mutation invariant check. Callers that wrap this in an actor/task
//! must preserve that atomicity; nothing here defends against a caller who
//! doesn't.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::admission::TrackerSnapshot;
use crate::config::SsotConstants;
use crate::error::{CoreError, EebViolationKind};
use crate::model::{
    AcceptedEvidence, BuildMode, CapacityMetrics, HardFuseTrigger, RejectReason,
};

/// Outcome of [`PatchTracker::commit_accepted_evidence`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommitResult {
    /// This call performed the mutation; `metrics` reflects the new state.
    Committed(CapacityMetrics),
    /// `candidateId` was already in the idempotency registry; `metrics` is
    /// the snapshot recorded at the original commit, replayed with
    /// `eebDelta` forced to `0.0`.
    AlreadyCommitted(CapacityMetrics),
}

/// Single-writer authority over patch count, EEB, build mode, the
/// idempotency registry, and the append-only evidence log (§3, §4.4).
#[derive(Debug)]
pub struct PatchTracker {
    patch_count_shadow: u64,
    eeb_remaining: f64,
    eeb_base_budget: f64,
    build_mode: BuildMode,
    committed: FxHashMap<Uuid, CapacityMetrics>,
    evidence_log: Vec<AcceptedEvidence>,
    reject_reason_distribution: BTreeMap<RejectReason, u64>,
    saturated_latched_at_patch_count: Option<u64>,
    saturated_latched_at_timestamp_millis: Option<u64>,
    saturated_latched_trigger: Option<HardFuseTrigger>,
}

impl PatchTracker {
    /// Constructs a fresh tracker with `eebRemaining` initialized to
    /// `constants.state_machine.eeb_base_budget`.
    #[must_use]
    pub fn new(constants: &SsotConstants) -> Self {
        Self {
            patch_count_shadow: 0,
            eeb_remaining: constants.state_machine.eeb_base_budget,
            eeb_base_budget: constants.state_machine.eeb_base_budget,
            build_mode: BuildMode::Normal,
            committed: FxHashMap::default(),
            evidence_log: Vec::new(),
            reject_reason_distribution: BTreeMap::new(),
            saturated_latched_at_patch_count: None,
            saturated_latched_at_timestamp_millis: None,
            saturated_latched_trigger: None,
        }
    }

    /// Current accepted-patch count.
    #[must_use]
    pub fn patch_count_shadow(&self) -> u64 {
        self.patch_count_shadow
    }

    /// Current remaining evidence energy budget.
    #[must_use]
    pub fn eeb_remaining(&self) -> f64 {
        self.eeb_remaining
    }

    /// Current build mode.
    #[must_use]
    pub fn build_mode(&self) -> BuildMode {
        self.build_mode
    }

    /// The append-only evidence log accumulated so far.
    #[must_use]
    pub fn evidence_log(&self) -> &[AcceptedEvidence] {
        &self.evidence_log
    }

    /// Running distribution of reject reasons recorded via
    /// [`Self::record_rejection`].
    #[must_use]
    pub fn reject_reason_distribution(&self) -> &BTreeMap<RejectReason, u64> {
        &self.reject_reason_distribution
    }

    /// Records a rejection in the running distribution. Called by the
    /// admission orchestrator (outside this authority's commit turn) for
    /// every non-accept decision, including duplicates.
    pub fn record_rejection(&mut self, reason: RejectReason) {
        *self.reject_reason_distribution.entry(reason).or_insert(0) += 1;
    }

    fn hard_fuse_trigger(&self, constants: &SsotConstants) -> Option<HardFuseTrigger> {
        if self.patch_count_shadow >= constants.state_machine.hard_limit_patch_count {
            Some(HardFuseTrigger::PatchCountHard)
        } else if self.eeb_remaining <= constants.state_machine.hard_budget_threshold {
            Some(HardFuseTrigger::EebHard)
        } else {
            None
        }
    }

    fn should_trigger_soft_limit(&self, constants: &SsotConstants) -> bool {
        self.patch_count_shadow >= constants.state_machine.soft_limit_patch_count
            || self.eeb_remaining
                <= self.eeb_base_budget * constants.state_machine.soft_budget_threshold
    }

    /// Builds the snapshot [`crate::admission::evaluate`] consults, without
    /// mutating tracker state.
    #[must_use]
    pub fn snapshot_for_admission(&self, constants: &SsotConstants) -> TrackerSnapshot {
        TrackerSnapshot {
            hard_fuse_trigger: self.hard_fuse_trigger(constants),
            should_trigger_soft_limit: self.should_trigger_soft_limit(constants),
            current_build_mode: self.build_mode,
        }
    }

    /// Runs the full commit protocol (§4.4 steps 1-11).
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidEebDelta`] if `eeb_delta` is below the
    /// configured minimum quantum, or
    /// [`CoreError::EebPrevalidationFailed`] if the projected EEB would be
    /// negative, exceed the base budget, or not be finite. Neither error
    /// mutates any state.
    ///
    /// # Panics
    /// Panics if a post-mutation invariant is violated — a broken
    /// invariant here means this function itself has a bug, not that the
    /// caller supplied bad input (that's caught by the pre-validation
    /// above), so this is treated as fatal rather than recoverable (§7).
    pub fn commit_accepted_evidence(
        &mut self,
        candidate_id: Uuid,
        evidence: AcceptedEvidence,
        eeb_delta: f64,
        constants: &SsotConstants,
    ) -> Result<CommitResult, CoreError> {
        if let Some(existing) = self.committed.get(&candidate_id) {
            let mut replay = existing.clone();
            replay.eeb_delta = 0.0;
            return Ok(CommitResult::AlreadyCommitted(replay));
        }

        if eeb_delta < constants.state_machine.eeb_min_quantum {
            return Err(CoreError::InvalidEebDelta {
                delta: eeb_delta,
                min_quantum: constants.state_machine.eeb_min_quantum,
            });
        }

        let projected_eeb = self.eeb_remaining - eeb_delta;
        if !projected_eeb.is_finite() {
            return Err(CoreError::EebPrevalidationFailed {
                kind: EebViolationKind::NotFinite,
                projected: projected_eeb,
            });
        }
        if projected_eeb < 0.0 {
            return Err(CoreError::EebPrevalidationFailed {
                kind: EebViolationKind::Negative,
                projected: projected_eeb,
            });
        }
        if projected_eeb > self.eeb_base_budget {
            return Err(CoreError::EebPrevalidationFailed {
                kind: EebViolationKind::ExceedsBudget,
                projected: projected_eeb,
            });
        }

        // --- single uninterrupted turn begins: append, mutate, re-check ---
        self.evidence_log.push(evidence);
        self.patch_count_shadow += 1;
        self.eeb_remaining = projected_eeb;

        self.check_invariants();

        let hard_trigger = self.hard_fuse_trigger(constants);
        if let Some(trigger) = hard_trigger {
            self.build_mode = BuildMode::Saturated;
            if self.saturated_latched_trigger.is_none() {
                self.saturated_latched_at_patch_count = Some(self.patch_count_shadow);
                self.saturated_latched_at_timestamp_millis = Some(evidence.timestamp_millis);
                self.saturated_latched_trigger = Some(trigger);
            }
        } else if self.should_trigger_soft_limit(constants) && self.build_mode == BuildMode::Normal
        {
            self.build_mode = BuildMode::Damping;
        }

        let metrics = CapacityMetrics {
            patch_count_shadow: self.patch_count_shadow,
            eeb_remaining: self.eeb_remaining,
            eeb_delta,
            build_mode: self.build_mode,
            reject_reason: None,
            hard_fuse_trigger: hard_trigger,
            reject_reason_distribution: self.reject_reason_distribution.clone(),
            invariant_violation_flag: false,
            saturated_latched_at_patch_count: self.saturated_latched_at_patch_count,
            saturated_latched_at_timestamp_millis: self.saturated_latched_at_timestamp_millis,
            saturated_latched_trigger: self.saturated_latched_trigger,
            flush_failure: false,
            decision_hash: [0u8; 32],
        };

        self.committed.insert(candidate_id, metrics.clone());
        // --- turn ends ---

        Ok(CommitResult::Committed(metrics))
    }

    fn check_invariants(&self) {
        assert!(
            self.eeb_remaining.is_finite(),
            "EEB_INVARIANT_VIOLATION: eebRemaining is not finite: {}",
            self.eeb_remaining
        );
        assert!(
            self.eeb_remaining >= 0.0 && self.eeb_remaining <= self.eeb_base_budget,
            "EEB_INVARIANT_VIOLATION: eebRemaining {} out of [0, {}]",
            self.eeb_remaining,
            self.eeb_base_budget
        );
        if self.saturated_latched_trigger.is_some() {
            assert_eq!(
                self.build_mode,
                BuildMode::Saturated,
                "EEB_INVARIANT_VIOLATION: saturated latch set without SATURATED build mode"
            );
        }
    }

    /// Clears only the idempotency registry. Evidence, counters, and the
    /// reject distribution remain for post-hoc audit (§4.4 "Session release").
    pub fn release_session(&mut self) {
        self.committed.clear();
    }
}
