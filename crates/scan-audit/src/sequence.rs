// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Trace lifecycle state machine and cross-event consistency checks (§4.10, §5).

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::event::{EventKind, FieldError, TraceEvent};

/// Lifecycle state of a single trace that has seen at least one event.
/// A trace with no recorded events at all is represented by the absence of
/// an entry, not by a variant here — see [`SequenceValidator::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    /// `trace_start` accepted; zero or more `trace_step`s accepted since.
    Started,
    /// `trace_end` accepted. Terminal.
    Ended,
    /// `trace_fail` accepted. Terminal.
    Failed,
}

impl TraceState {
    const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Failed)
    }
}

#[derive(Debug, Clone)]
struct TraceRecord {
    state: TraceState,
    trace_id: String,
    scene_id: String,
    policy_hash: String,
    last_event_index: u64,
}

/// Everything that can reject an event based on trace history, distinct
/// from the history-independent checks in [`crate::event::FieldError`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SequenceError {
    /// The event failed a history-independent field check.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// A `trace_start` was seen twice for the same `traceId`.
    #[error("duplicate trace_start")]
    DuplicateStart,
    /// `trace_step`, `trace_end`, or `trace_fail` arrived before `trace_start`.
    #[error("event arrived before trace_start")]
    BeforeStart,
    /// An event arrived after the trace reached `Ended`/`Failed`.
    #[error("event arrived after terminal state")]
    AfterTerminal,
    /// `sceneId` did not match the value recorded at `trace_start`.
    #[error("sceneId does not match trace_start")]
    SceneIdMismatch,
    /// `policyHash` did not match the value recorded at `trace_start`.
    #[error("policyHash does not match trace_start")]
    PolicyHashMismatch,
    /// `eventId`'s numeric index did not strictly increase.
    #[error("eventId index did not strictly increase")]
    EventIndexNotIncreasing,
}

/// Per-trace lifecycle and cross-event consistency validator (§4.10).
///
/// One instance tracks arbitrarily many concurrently-open traces, keyed by
/// `traceId`; each trace's own event sequence must still arrive in order
/// (§5's per-trace ordering guarantee) — this validator enforces that
/// ordering rather than assuming it.
#[derive(Debug, Default)]
pub struct SequenceValidator {
    traces: FxHashMap<String, TraceRecord>,
}

impl SequenceValidator {
    /// Constructs a validator tracking no traces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            traces: FxHashMap::default(),
        }
    }

    /// Validates `event` against both the field-level table
    /// ([`TraceEvent::validate_fields`]) and this trace's recorded history,
    /// then — only if every check passes — commits the resulting state
    /// transition. A rejected event leaves all prior state untouched.
    pub fn validate(&mut self, event: &TraceEvent) -> Result<(), SequenceError> {
        event.validate_fields()?;

        let index = event_index(&event.event_id);

        match (self.traces.get(&event.trace_id), event.kind) {
            (None, EventKind::Start) => {
                self.traces.insert(
                    event.trace_id.clone(),
                    TraceRecord {
                        state: TraceState::Started,
                        trace_id: event.trace_id.clone(),
                        scene_id: event.scene_id.clone(),
                        policy_hash: event.policy_hash.clone(),
                        last_event_index: index,
                    },
                );
                Ok(())
            }
            (None, _) => Err(SequenceError::BeforeStart),
            (Some(_), EventKind::Start) => Err(SequenceError::DuplicateStart),
            (Some(record), _) => {
                if record.state.is_terminal() {
                    return Err(SequenceError::AfterTerminal);
                }
                if record.scene_id != event.scene_id {
                    return Err(SequenceError::SceneIdMismatch);
                }
                if record.policy_hash != event.policy_hash {
                    return Err(SequenceError::PolicyHashMismatch);
                }
                if index <= record.last_event_index {
                    return Err(SequenceError::EventIndexNotIncreasing);
                }
                let next_state = match event.kind {
                    EventKind::Step => TraceState::Started,
                    EventKind::End => TraceState::Ended,
                    EventKind::Fail => TraceState::Failed,
                    EventKind::Start => unreachable!("handled above"),
                };
                let record = self
                    .traces
                    .get_mut(&event.trace_id)
                    .expect("looked up above");
                record.state = next_state;
                record.last_event_index = index;
                Ok(())
            }
        }
    }

    /// Current lifecycle state of `trace_id`, or `None` if no event for it
    /// has ever been accepted.
    #[must_use]
    pub fn state(&self, trace_id: &str) -> Option<TraceState> {
        self.traces.get(trace_id).map(|r| r.state)
    }

    /// Whether `trace_id` has reached the terminal `Ended` state. Used by
    /// [`crate::emitter::AuditTraceEmitter::emit_end`]'s v7.1.0 rule.
    #[must_use]
    pub fn is_ended(&self, trace_id: &str) -> bool {
        self.state(trace_id) == Some(TraceState::Ended)
    }
}

fn event_index(event_id: &str) -> u64 {
    event_id
        .rsplit_once(':')
        .and_then(|(_, idx)| idx.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Metrics;
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
            inputs: vec![crate::ids::InputRecord {
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

    fn step(trace_id: &str, index: u64) -> TraceEvent {
        let mut e = start(trace_id);
        e.kind = EventKind::Step;
        e.event_id = format!("{trace_id}:{index}");
        e.inputs.clear();
        e.params_summary = Value::Null;
        e.action_type = Some("scan".to_string());
        e
    }

    fn end(trace_id: &str, index: u64) -> TraceEvent {
        let mut e = start(trace_id);
        e.kind = EventKind::End;
        e.event_id = format!("{trace_id}:{index}");
        e.inputs.clear();
        e.params_summary = Value::Null;
        e.metrics = Some(Metrics {
            success: true,
            error_code: None,
            quality_score: None,
        });
        e
    }

    #[test]
    fn happy_path_start_step_end() {
        let trace_id = "a".repeat(64);
        let mut v = SequenceValidator::new();
        assert!(v.validate(&start(&trace_id)).is_ok());
        assert!(v.validate(&step(&trace_id, 1)).is_ok());
        assert!(v.validate(&end(&trace_id, 2)).is_ok());
        assert!(v.is_ended(&trace_id));
    }

    #[test]
    fn duplicate_start_is_rejected() {
        let trace_id = "a".repeat(64);
        let mut v = SequenceValidator::new();
        v.validate(&start(&trace_id)).unwrap();
        assert_eq!(
            v.validate(&start(&trace_id)),
            Err(SequenceError::DuplicateStart)
        );
    }

    #[test]
    fn step_before_start_is_rejected() {
        let trace_id = "a".repeat(64);
        let mut v = SequenceValidator::new();
        assert_eq!(
            v.validate(&step(&trace_id, 0)),
            Err(SequenceError::BeforeStart)
        );
    }

    #[test]
    fn events_after_terminal_are_rejected() {
        let trace_id = "a".repeat(64);
        let mut v = SequenceValidator::new();
        v.validate(&start(&trace_id)).unwrap();
        v.validate(&end(&trace_id, 1)).unwrap();
        assert_eq!(
            v.validate(&step(&trace_id, 2)),
            Err(SequenceError::AfterTerminal)
        );
    }

    #[test]
    fn non_increasing_event_index_is_rejected() {
        let trace_id = "a".repeat(64);
        let mut v = SequenceValidator::new();
        v.validate(&start(&trace_id)).unwrap();
        assert_eq!(
            v.validate(&step(&trace_id, 0)),
            Err(SequenceError::EventIndexNotIncreasing)
        );
    }

    #[test]
    fn scene_id_mismatch_is_rejected() {
        let trace_id = "a".repeat(64);
        let mut v = SequenceValidator::new();
        v.validate(&start(&trace_id)).unwrap();
        let mut bad_step = step(&trace_id, 1);
        bad_step.scene_id = "d".repeat(64);
        assert_eq!(v.validate(&bad_step), Err(SequenceError::SceneIdMismatch));
    }

    #[test]
    fn rejected_event_does_not_mutate_state() {
        let trace_id = "a".repeat(64);
        let mut v = SequenceValidator::new();
        v.validate(&start(&trace_id)).unwrap();
        let mut bad_end = end(&trace_id, 1);
        bad_end.metrics = Some(Metrics {
            success: false,
            error_code: None,
            quality_score: None,
        });
        assert!(v.validate(&bad_end).is_err());
        assert_eq!(v.state(&trace_id), Some(TraceState::Started));
        assert!(!v.is_ended(&trace_id));
    }
}
