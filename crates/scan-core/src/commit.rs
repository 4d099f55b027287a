// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `EvidenceCommitTransaction`: the thin coordinator between an
//! [`AdmissionDecision`] and [`PatchTracker`]'s commit protocol (§4.5).

use uuid::Uuid;

use crate::clock::Clock;
use crate::config::SsotConstants;
use crate::model::{AcceptedEvidence, Classification};
use crate::tracker::{CommitResult, PatchTracker};

/// Best-effort persistence hook invoked after the tracker's turn returns
/// (§4.4 "Async persistence"). A `false`/failed result records
/// `flush_failure` for audit but must never roll back the logical commit —
/// this trait has no way to signal "undo", by design.
pub trait EvidencePersistenceHandler {
    /// Attempts to durably persist `evidence`. Returns `true` on success.
    fn persist(&self, evidence: &AcceptedEvidence) -> bool;
}

/// Outcome of [`EvidenceCommitTransaction::commit`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The decision was not `Accepted`; no tracker mutation was attempted.
    Rejected,
    /// The decision was `Accepted` and handed to the tracker.
    Committed {
        /// The tracker's own commit/idempotent-replay result.
        result: CommitResult,
        /// Whether the best-effort persistence handler (run after the
        /// tracker's turn, outside its critical section) failed.
        flush_failure: bool,
    },
}

/// Stateless coordinator: constructs [`AcceptedEvidence`] for accepted
/// decisions and invokes [`PatchTracker::commit_accepted_evidence`],
/// scheduling the persistence flush without making the logical commit wait
/// on it.
pub struct EvidenceCommitTransaction;

impl EvidenceCommitTransaction {
    /// Runs one commit attempt for `candidate_id` under `decision`.
    ///
    /// # Errors
    /// Propagates [`crate::error::CoreError`] from
    /// [`PatchTracker::commit_accepted_evidence`] unchanged; this function
    /// adds no new failure modes of its own for the ACCEPTED path.
    pub fn commit(
        tracker: &mut PatchTracker,
        candidate_id: Uuid,
        decision: &crate::model::AdmissionDecision,
        eeb_delta: f64,
        clock: &dyn Clock,
        constants: &SsotConstants,
        persistence: Option<&dyn EvidencePersistenceHandler>,
    ) -> Result<CommitOutcome, crate::error::CoreError> {
        if decision.classification != Classification::Accepted {
            return Ok(CommitOutcome::Rejected);
        }

        let evidence = AcceptedEvidence {
            candidate_id,
            timestamp_millis: clock.now_millis(),
            eeb_delta,
        };

        let result =
            tracker.commit_accepted_evidence(candidate_id, evidence, eeb_delta, constants)?;

        let flush_failure = persistence.is_some_and(|handler| !handler.persist(&evidence));
        if flush_failure {
            tracing::warn!(%candidate_id, "evidence persistence flush failed after commit");
        }

        Ok(CommitOutcome::Committed {
            result,
            flush_failure,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::{AdmissionDecision, BuildMode, GuidanceSignal};

    fn accepted_decision(candidate_id: Uuid) -> AdmissionDecision {
        AdmissionDecision {
            candidate_id,
            classification: Classification::Accepted,
            reject_reason: None,
            eeb_delta: 1.0,
            build_mode: BuildMode::Normal,
            guidance_signal: GuidanceSignal::None,
            hard_fuse_trigger: None,
            decision_hash: [0u8; 32],
        }
    }

    struct AlwaysFails;
    impl EvidencePersistenceHandler for AlwaysFails {
        fn persist(&self, _evidence: &AcceptedEvidence) -> bool {
            false
        }
    }

    #[test]
    fn rejected_decision_never_touches_tracker() {
        let constants = SsotConstants::lab();
        let mut tracker = PatchTracker::new(&constants);
        let mut decision = accepted_decision(Uuid::new_v4());
        decision.classification = Classification::Rejected;
        let outcome = EvidenceCommitTransaction::commit(
            &mut tracker,
            decision.candidate_id,
            &decision,
            0.0,
            &FixedClock(0),
            &constants,
            None,
        )
        .unwrap();
        assert_eq!(outcome, CommitOutcome::Rejected);
        assert_eq!(tracker.patch_count_shadow(), 0);
    }

    #[test]
    fn accepted_decision_commits_and_reports_flush_failure() {
        let constants = SsotConstants::lab();
        let mut tracker = PatchTracker::new(&constants);
        let id = Uuid::new_v4();
        let decision = accepted_decision(id);
        let outcome = EvidenceCommitTransaction::commit(
            &mut tracker,
            id,
            &decision,
            constants.state_machine.eeb_min_quantum,
            &FixedClock(42),
            &constants,
            Some(&AlwaysFails),
        )
        .unwrap();
        match outcome {
            CommitOutcome::Committed { flush_failure, .. } => assert!(flush_failure),
            CommitOutcome::Rejected => panic!("expected Committed"),
        }
        assert_eq!(tracker.patch_count_shadow(), 1);
    }
}
