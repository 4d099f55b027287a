// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! scan-core: deterministic evidence admission core for a handheld 3D
//! scanning session.
//!
//! This crate owns the Perception→Decision boundary: zero-trig direction
//! bucketing, duplicate detection, the admission controller, the
//! single-writer `PatchTracker`/`EvidenceCommitTransaction` pair, the
//! quantized token limiter, and the domain boundary enforcer. Spatial
//! storage (`scan-grid`) and the audit ledger (`scan-audit`) are downstream
//! crates that depend on this one for identifiers and SSOT constants.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

/// Admission decision priority chain (§4.3).
pub mod admission;
/// Zero-trig direction bucketing and bucket bitsets (§4.1).
pub mod bucketing;
/// Canonical fixed-width byte layouts used for hashing and idempotency (§6).
pub mod canonical;
/// Deterministic clock abstraction.
pub mod clock;
/// SSOT constant bundle and configuration profiles (§6).
pub mod config;
/// `EvidenceCommitTransaction`: atomic commit coordinator (§4.5).
pub mod commit;
/// Domain boundary enforcer (§4.12).
pub mod boundary;
/// Pose/coverage-cell/radiance duplicate detection (§4.2).
pub mod duplicate;
/// Error taxonomy.
pub mod error;
/// Identifiers and content hashing.
pub mod ident;
/// Quantized token limiter (§4.11).
pub mod limiter;
/// Core data model: candidates, decisions, evidence, metrics (§3).
pub mod model;
/// `PatchTracker`: single-writer capacity and EEB authority (§4.4).
pub mod tracker;

pub use admission::{AdmissionController, InformationGainCalculator, TrackerSnapshot};
pub use bucketing::{
    phi_bucket, theta_bucket_full, theta_bucket_optimized, PhiBucketBitset, ShadowStats,
    ShadowVerifier, ThetaBucketBitset,
};
pub use canonical::{
    CanonicalEncoder, DecisionHashInputV1, ExtensionResultIdempotencyV1, ExtensionResultTag,
    ThrottleStats,
};
pub use boundary::{BoundaryEnforcer, Domain, EnforcementPolicy};
pub use clock::{Clock, FixedClock, SequenceClock, SystemClock};
pub use commit::{CommitOutcome, EvidenceCommitTransaction, EvidencePersistenceHandler};
pub use config::{ProfileName, SsotConstants};
pub use duplicate::{signature as duplicate_signature, DuplicateDetector};
pub use error::{CoreError, EebViolationKind};
pub use ident::Hash;
pub use limiter::{LimiterFault, QuantizedTokenLimiter};
pub use model::{
    AcceptedEvidence, AdmissionDecision, BuildMode, CapacityMetrics, Classification,
    GuidanceSignal, HardFuseTrigger, PatchCandidate, RejectReason,
};
pub use tracker::{CommitResult, PatchTracker};
