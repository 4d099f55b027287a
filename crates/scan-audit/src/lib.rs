// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! scan-audit: the schema-versioned, content-addressed, hash-chained audit
//! trace contract (§4.9, §4.10, §6).
//!
//! This crate is downstream of `scan-core` for identifier hashing only; it
//! owns no admission, capacity, or grid logic of its own.
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
    clippy::module_name_repetitions,
    clippy::use_self
)]

/// Trace event types and the per-event-type field constraint table (§4.10).
pub mod event;
/// `AuditTraceEmitter`, validating then writing events (§4.10).
pub mod emitter;
/// Deterministic `traceId`/`sceneId` derivation (§4.10).
pub mod ids;
/// Canonical JSON encoder (§4.10, §6).
pub mod json;
/// Signed NDJSON audit log (§6).
pub mod ndjson;
/// SHA-chained coverage-state transition log (§4.9).
pub mod provenance;
/// Trace lifecycle state machine and cross-event consistency (§4.10, §5).
pub mod sequence;

pub use emitter::{AuditTraceEmitter, AuditWriteSink, EmitOutcome};
pub use event::{EventKind, FieldError, Metrics, TraceEvent};
pub use ids::{hex_id, scene_id, trace_id, InputRecord};
pub use json::canonical_json;
pub use ndjson::{recover_last_signature, LogInputError, PayloadSigner, SignedAuditLogWriter};
pub use provenance::{ProvenanceChain, ProvenanceEntry, TransitionInput};
pub use sequence::{SequenceError, SequenceValidator, TraceState};
