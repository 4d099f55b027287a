// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `AuditTraceEmitter`: validates then writes trace events, with the
//! v7.1.0 `emit_end` rule (§4.10).

use crate::event::TraceEvent;
use crate::sequence::{SequenceError, SequenceValidator, TraceState};

/// Injected by the caller; mirrors [`scan_core::commit::EvidencePersistenceHandler`]'s
/// role as the single non-pure seam at the edge of an otherwise pure turn.
pub trait AuditWriteSink {
    /// Persists one validated event. Failure is best-effort: it never
    /// un-does a state transition the validator already committed.
    fn write_event(&mut self, event: &TraceEvent) -> Result<(), String>;
}

/// Result of one `emit_*` call.
#[derive(Debug, Clone, PartialEq)]
pub enum EmitOutcome {
    /// Validation passed and the write succeeded.
    Emitted,
    /// Validation passed but the write failed. The state transition is
    /// still committed — see [`AuditTraceEmitter::emit_end`]'s doc comment
    /// for why this matters for `isEnded`.
    EmittedWithFlushFailure,
    /// Validation failed; nothing was written and no state changed.
    Rejected(SequenceError),
}

/// Validates events against a [`SequenceValidator`] and forwards them to an
/// [`AuditWriteSink`]. One instance per audit stream; concurrent traces are
/// fine, concurrent writers to the same stream are not (§5's "one writer
/// per audit log append port").
pub struct AuditTraceEmitter<S: AuditWriteSink> {
    validator: SequenceValidator,
    sink: S,
}

impl<S: AuditWriteSink> AuditTraceEmitter<S> {
    /// Constructs an emitter writing through `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            validator: SequenceValidator::new(),
            sink,
        }
    }

    /// Validates `event` and, if it passes, writes it. Used for
    /// `trace_start` and `trace_step`, where there is no special rule
    /// beyond "don't write what doesn't validate".
    pub fn emit(&mut self, event: &TraceEvent) -> EmitOutcome {
        if let Err(err) = self.validator.validate(event) {
            return EmitOutcome::Rejected(err);
        }
        match self.sink.write_event(event) {
            Ok(()) => EmitOutcome::Emitted,
            Err(_) => EmitOutcome::EmittedWithFlushFailure,
        }
    }

    /// Emits a `trace_end` event under the v7.1.0 rule: (a) run validation;
    /// (b) if validation fails, `isEnded` stays false — nothing is written
    /// and no state changes; (c) if validation passes, the trace transitions
    /// to `Ended` regardless of whether the subsequent write succeeds,
    /// because the logical decision to end the trace is committed the
    /// moment the sequence validator accepts it — a downstream persistence
    /// failure is recorded but must never roll that back.
    pub fn emit_end(&mut self, event: &TraceEvent) -> EmitOutcome {
        self.emit(event)
    }

    /// Current lifecycle state of `trace_id`, or `None` if no event for it
    /// has ever been accepted.
    #[must_use]
    pub fn trace_state(&self, trace_id: &str) -> Option<TraceState> {
        self.validator.state(trace_id)
    }

    /// Whether `trace_id` has reached the terminal `Ended` state.
    #[must_use]
    pub fn is_ended(&self, trace_id: &str) -> bool {
        self.validator.is_ended(trace_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Metrics};
    use crate::ids::InputRecord;
    use serde_json::Value;

    fn start(trace_id: &str) -> TraceEvent {
        TraceEvent {
            kind: EventKind::Start,
            schema_version: 1,
            trace_id: trace_id.to_string(),
            scene_id: "b".repeat(64),
            event_id: format!("{trace_id}:0"),
            policy_hash: "c".repeat(64),
            pipeline_version: "1.0.0".to_string(),
            inputs: vec![InputRecord {
                path: "a".to_string(),
                content_hash: "0".repeat(64),
                byte_size: 1,
            }],
            params_summary: serde_json::json!({"k": 1}),
            action_type: None,
            metrics: None,
            artifact_ref: None,
            build_meta: Value::Null,
        }
    }

    fn end(trace_id: &str, success: bool) -> TraceEvent {
        let mut e = start(trace_id);
        e.kind = EventKind::End;
        e.event_id = format!("{trace_id}:1");
        e.inputs.clear();
        e.params_summary = Value::Null;
        e.metrics = Some(Metrics {
            success,
            error_code: None,
            quality_score: None,
        });
        e
    }

    struct AlwaysOk;
    impl AuditWriteSink for AlwaysOk {
        fn write_event(&mut self, _event: &TraceEvent) -> Result<(), String> {
            Ok(())
        }
    }

    struct AlwaysFails;
    impl AuditWriteSink for AlwaysFails {
        fn write_event(&mut self, _event: &TraceEvent) -> Result<(), String> {
            Err("disk full".to_string())
        }
    }

    #[test]
    fn validation_failure_leaves_is_ended_false() {
        let trace_id = "a".repeat(64);
        let mut emitter = AuditTraceEmitter::new(AlwaysOk);
        emitter.emit(&start(&trace_id));
        let invalid_end = end(&trace_id, false);
        let outcome = emitter.emit_end(&invalid_end);
        assert!(matches!(outcome, EmitOutcome::Rejected(_)));
        assert!(!emitter.is_ended(&trace_id));
    }

    #[test]
    fn write_failure_after_valid_end_still_marks_ended() {
        let trace_id = "a".repeat(64);
        let mut emitter = AuditTraceEmitter::new(AlwaysFails);
        emitter.emit(&start(&trace_id));
        let outcome = emitter.emit_end(&end(&trace_id, true));
        assert_eq!(outcome, EmitOutcome::EmittedWithFlushFailure);
        assert!(emitter.is_ended(&trace_id));
    }

    #[test]
    fn successful_end_marks_ended() {
        let trace_id = "a".repeat(64);
        let mut emitter = AuditTraceEmitter::new(AlwaysOk);
        emitter.emit(&start(&trace_id));
        let outcome = emitter.emit_end(&end(&trace_id, true));
        assert_eq!(outcome, EmitOutcome::Emitted);
        assert!(emitter.is_ended(&trace_id));
    }
}
