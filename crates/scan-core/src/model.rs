// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core data model (§3): candidates, decisions, accepted evidence, and the
//! per-commit capacity snapshot.

use std::collections::BTreeMap;

use crate::ident::Hash;

/// A newly observed surface patch offered for admission. Identity, pose,
/// coverage cell, and radiance are fixed at construction; nothing in this
/// crate mutates a `PatchCandidate` in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchCandidate {
    /// Caller-assigned identity, stable across duplicate resubmission.
    pub candidate_id: uuid::Uuid,
    /// World-space pose, `(x, y, z)`.
    pub pose: [f64; 3],
    /// Coverage cell this candidate falls into, `(cellX, cellZ)`.
    pub coverage_cell: [i32; 2],
    /// Observed radiance, `(r, g, b)`.
    pub radiance: [f64; 3],
}

impl PatchCandidate {
    /// Constructs a candidate. There is no mutator; a new candidate is a new value.
    #[must_use]
    pub fn new(
        candidate_id: uuid::Uuid,
        pose: [f64; 3],
        coverage_cell: [i32; 2],
        radiance: [f64; 3],
    ) -> Self {
        Self {
            candidate_id,
            pose,
            coverage_cell,
            radiance,
        }
    }
}

/// Outcome of [`crate::admission::AdmissionController`] evaluating a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The candidate was admitted and will be committed.
    Accepted,
    /// The candidate was rejected for a reason other than duplication.
    Rejected,
    /// The candidate's signature matched a previously seen candidate.
    DuplicateRejected,
}

/// Why a candidate was rejected (never populated alongside `Classification::Accepted`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RejectReason {
    /// Signature collision with a prior candidate.
    Duplicate,
    /// `hardFuseTrigger` was present at evaluation time.
    HardCap,
    /// SOFT limiting active and information gain fell below `IG_MIN_SOFT`.
    LowGainSoft,
    /// SOFT limiting active, gain acceptable, but novelty fell below `NOVELTY_MIN_SOFT`.
    RedundantCoverage,
}

/// `PatchTracker`'s admission-pressure state (§3, §4.4). Monotonically
/// escalates; never downgrades once DAMPING or SATURATED is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildMode {
    /// No limiting in effect.
    Normal,
    /// SOFT limit triggered; gain/novelty gating is active.
    Damping,
    /// HARD limit triggered; latched terminal state.
    Saturated,
}

/// Which HARD trigger caused a `REJECTED/HARD_CAP` decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardFuseTrigger {
    /// `patchCountShadow` reached `HARD_LIMIT_PATCH_COUNT`.
    PatchCountHard,
    /// `eebRemaining` reached `HARD_BUDGET_THRESHOLD`.
    EebHard,
}

/// User-facing guidance accompanying a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceSignal {
    /// No guidance to surface.
    None,
    /// Suggest the user move toward under-covered directions (DAMPING mode).
    DirectionalAffordance,
}

/// The full outcome of one [`crate::admission::AdmissionController`] evaluation.
///
/// `decisionHash` is derived deterministically from the canonical encoding
/// of every preceding field (see [`crate::canonical`]); identical inputs
/// always yield an identical hash.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionDecision {
    /// The candidate this decision concerns.
    pub candidate_id: uuid::Uuid,
    /// Accept/reject/duplicate-reject outcome.
    pub classification: Classification,
    /// Populated iff `classification != Accepted`.
    pub reject_reason: Option<RejectReason>,
    /// EEB charge for this decision; `0.0` for any non-accept outcome.
    pub eeb_delta: f64,
    /// Build mode in effect when this decision was made.
    pub build_mode: BuildMode,
    /// Guidance to surface to the user.
    pub guidance_signal: GuidanceSignal,
    /// Populated iff this decision was a `HARD_CAP` rejection.
    pub hard_fuse_trigger: Option<HardFuseTrigger>,
    /// SHA-256 of the canonical encoding of the fields above.
    pub decision_hash: Hash,
}

/// A committed patch's durable evidence record. Append-only: once placed in
/// `PatchTracker`'s evidence log, never mutated or evicted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptedEvidence {
    /// The committed candidate's identity.
    pub candidate_id: uuid::Uuid,
    /// Wall-clock commit time in milliseconds (see [`crate::clock::Clock`]).
    pub timestamp_millis: u64,
    /// EEB charged for this commit.
    pub eeb_delta: f64,
}

/// Snapshot emitted on every commit, reflecting exactly the state produced
/// by that commit's turn (§4.4 step 10).
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityMetrics {
    /// `patchCountShadow` after this commit.
    pub patch_count_shadow: u64,
    /// `eebRemaining` after this commit.
    pub eeb_remaining: f64,
    /// EEB charged by this commit (`0.0` for an idempotent replay).
    pub eeb_delta: f64,
    /// Build mode after this commit.
    pub build_mode: BuildMode,
    /// Reject reason, if this snapshot accompanies a rejection.
    pub reject_reason: Option<RejectReason>,
    /// Hard fuse trigger, if this snapshot accompanies a `HARD_CAP` rejection.
    pub hard_fuse_trigger: Option<HardFuseTrigger>,
    /// Running count of each reject reason seen this session.
    pub reject_reason_distribution: BTreeMap<RejectReason, u64>,
    /// Set if a post-mutation invariant check ever failed (defense in depth;
    /// should never be observed in practice since invariant failure panics).
    pub invariant_violation_flag: bool,
    /// Patch count at which the SATURATED latch engaged, if ever.
    pub saturated_latched_at_patch_count: Option<u64>,
    /// Wall-clock time at which the SATURATED latch engaged, if ever.
    pub saturated_latched_at_timestamp_millis: Option<u64>,
    /// Which trigger caused the SATURATED latch, if ever.
    pub saturated_latched_trigger: Option<HardFuseTrigger>,
    /// Set if the best-effort async persistence handler failed after this commit.
    pub flush_failure: bool,
    /// Decision hash of the decision this commit is settling.
    pub decision_hash: Hash,
}
