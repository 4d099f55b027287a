// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for `scan-core` (§7).
//!
//! Only contract violations and domain-boundary rejections are represented
//! as [`CoreError`]. Fatal invariant breaks panic (see module docs on
//! [`crate::tracker`] and [`crate::limiter`]); rejected-but-valid outcomes are
//! plain [`crate::model::AdmissionDecision`] values, never errors.

use thiserror::Error;

/// Sub-kind of an EEB pre-validation failure (§6 `EEB_INVARIANT_VIOLATION`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EebViolationKind {
    /// `projectedEEB` would be negative.
    Negative,
    /// `projectedEEB` would exceed `EEB_BASE_BUDGET`.
    ExceedsBudget,
    /// `projectedEEB` is NaN or infinite.
    NotFinite,
}

/// Errors surfaced to callers of `scan-core`'s public API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// `commitAcceptedEvidence` was called with `eebDelta < EEB_MIN_QUANTUM`.
    #[error("invalid eeb delta: {delta} is below the minimum quantum {min_quantum}")]
    InvalidEebDelta {
        /// The delta that was rejected.
        delta: f64,
        /// `EEB_MIN_QUANTUM` at the time of the call.
        min_quantum: f64,
    },
    /// Pre-validation of `projectedEEB` failed before any mutation occurred
    /// (§4.4 step 3). Distinct from the post-mutation invariant panic: this
    /// is a rejected call, not a broken invariant.
    #[error("eeb pre-validation failed: {kind:?} (projected={projected})")]
    EebPrevalidationFailed {
        /// Which condition failed.
        kind: EebViolationKind,
        /// The `projectedEEB` value that failed validation.
        projected: f64,
    },
    /// A candidate was submitted for commit without first running it through
    /// [`crate::admission::AdmissionController`].
    #[error("candidate {0} has no admission decision to commit")]
    MissingDecision(String),
    /// A session operation was attempted after `releaseSession` cleared the
    /// idempotency registry and the tracker considers the session closed.
    #[error("session is closed")]
    SessionClosed,
    /// A cross-domain access was rejected under the `hardFail` enforcement
    /// policy (§4.12).
    #[error("domain boundary violation: {from:?} -> {to:?}")]
    BoundaryViolation {
        /// Origin domain of the rejected transition.
        from: crate::boundary::Domain,
        /// Destination domain of the rejected transition.
        to: crate::boundary::Domain,
    },
}
