// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Audit trace event types and the per-event-type field constraint table (§4.10).

use serde_json::Value;
use thiserror::Error;

use crate::ids::InputRecord;

/// The four kinds of audit event a trace may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Opens a trace. Exactly one per trace.
    Start,
    /// Records an intermediate step. Zero or more per trace.
    Step,
    /// Closes a trace successfully. Terminal.
    End,
    /// Closes a trace unsuccessfully. Terminal.
    Fail,
}

impl EventKind {
    /// The wire string form, required to equal `entryType` on the record (§6).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "trace_start",
            Self::Step => "trace_step",
            Self::End => "trace_end",
            Self::Fail => "trace_fail",
        }
    }
}

/// `metrics` payload, required on `End`/`Fail`, forbidden on `Start`/`Step`.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// Must be `true` on `End`, `false` on `Fail`.
    pub success: bool,
    /// Required on `Fail`, forbidden on `End`.
    pub error_code: Option<String>,
    /// Optional on `End`, forbidden on `Fail`.
    pub quality_score: Option<f64>,
}

/// One audit trace event, carrying the fields common to all four kinds
/// plus the event-specific ones (§3, §6).
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    /// Event discriminant.
    pub kind: EventKind,
    /// Fixed at `1`; any other value is a global schema violation.
    pub schema_version: u8,
    /// 64-lowercase-hex trace identifier, shared by every event in a trace.
    pub trace_id: String,
    /// 64-lowercase-hex scene identifier, shared by every event in a trace.
    pub scene_id: String,
    /// `<traceId>:<index>`.
    pub event_id: String,
    /// 64-lowercase-hex policy identifier, shared by every event in a trace.
    pub policy_hash: String,
    /// Non-empty, no `|`, no control characters.
    pub pipeline_version: String,
    /// Required nonempty on `Start`; any on `Step`; must be empty on `End`/`Fail`.
    pub inputs: Vec<InputRecord>,
    /// Required on `Start`; must be empty (`Value::Null` or an empty object) elsewhere.
    pub params_summary: Value,
    /// Required on `Step`; forbidden on `Start`/`End`/`Fail`.
    pub action_type: Option<String>,
    /// Required on `End`/`Fail`; forbidden on `Start`/`Step`.
    pub metrics: Option<Metrics>,
    /// Optional on `End`; forbidden elsewhere.
    pub artifact_ref: Option<String>,
    /// Opaque build metadata, always permitted.
    pub build_meta: Value,
}

/// Everything that can make a [`TraceEvent`] invalid, independent of trace
/// history (see [`crate::sequence::SequenceValidator`] for history-dependent
/// checks).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    /// `schemaVersion` was not `1`.
    #[error("schemaVersionInvalid: expected 1, got {0}")]
    SchemaVersionInvalid(u8),
    /// A hex-identifier field was not 64 lowercase hex characters.
    #[error("invalid hex field {field}")]
    InvalidHexField {
        /// Name of the offending field.
        field: &'static str,
    },
    /// `pipelineVersion` was empty, contained `|`, or contained a control character.
    #[error("invalid pipelineVersion")]
    InvalidPipelineVersion,
    /// `eventId` did not match `^[0-9a-f]{64}:(0|[1-9][0-9]*)$` or its index exceeded 1_000_000.
    #[error("invalid eventId")]
    InvalidEventId,
    /// `eventId`'s trace-id prefix did not match `traceId`.
    #[error("eventId does not reference traceId")]
    EventIdTraceIdMismatch,
    /// A string field or JSON key/value contained a literal `|`.
    #[error("field {field} contains a forbidden '|'")]
    ContainsPipe {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A required field was missing or an empty field was required to be empty and was not.
    #[error("field constraint violated: {0}")]
    FieldConstraint(&'static str),
}

fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn is_valid_pipeline_version(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b != b'|' && b > 0x1F && b != 0x7F)
}

fn is_valid_event_id(trace_id: &str, event_id: &str) -> bool {
    let Some((prefix, index)) = event_id.split_once(':') else {
        return false;
    };
    if prefix != trace_id || !is_hex64(prefix) {
        return false;
    }
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if index.len() > 1 && index.starts_with('0') {
        return false;
    }
    matches!(index.parse::<u64>(), Ok(n) if n <= 1_000_000)
}

fn value_contains_pipe(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains('|'),
        Value::Array(items) => items.iter().any(value_contains_pipe),
        Value::Object(map) => map
            .iter()
            .any(|(k, v)| k.contains('|') || value_contains_pipe(v)),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

fn is_empty_value(value: &Value) -> bool {
    matches!(value, Value::Null)
        || matches!(value, Value::Object(m) if m.is_empty())
        || matches!(value, Value::Array(a) if a.is_empty())
}

impl TraceEvent {
    /// Validates the global schema constraints and the per-event-type field
    /// table. Does not consult trace history; see
    /// [`crate::sequence::SequenceValidator`] for lifecycle and cross-event
    /// checks.
    pub fn validate_fields(&self) -> Result<(), FieldError> {
        if self.schema_version != 1 {
            return Err(FieldError::SchemaVersionInvalid(self.schema_version));
        }
        if !is_hex64(&self.trace_id) {
            return Err(FieldError::InvalidHexField { field: "traceId" });
        }
        if !is_hex64(&self.scene_id) {
            return Err(FieldError::InvalidHexField { field: "sceneId" });
        }
        if !is_hex64(&self.policy_hash) {
            return Err(FieldError::InvalidHexField {
                field: "policyHash",
            });
        }
        if !is_valid_pipeline_version(&self.pipeline_version) {
            return Err(FieldError::InvalidPipelineVersion);
        }
        if !is_valid_event_id(&self.trace_id, &self.event_id) {
            return Err(FieldError::InvalidEventId);
        }
        if self.pipeline_version.contains('|') {
            return Err(FieldError::ContainsPipe {
                field: "pipelineVersion",
            });
        }
        if value_contains_pipe(&self.params_summary) {
            return Err(FieldError::ContainsPipe {
                field: "paramsSummary",
            });
        }
        if value_contains_pipe(&self.build_meta) {
            return Err(FieldError::ContainsPipe {
                field: "buildMeta",
            });
        }
        if let Some(artifact) = &self.artifact_ref {
            if artifact.contains('|') {
                return Err(FieldError::ContainsPipe {
                    field: "artifactRef",
                });
            }
        }
        if let Some(metrics) = &self.metrics {
            if let Some(code) = &metrics.error_code {
                if code.contains('|') {
                    return Err(FieldError::ContainsPipe {
                        field: "metrics.errorCode",
                    });
                }
            }
        }

        self.validate_event_specific()
    }

    fn validate_event_specific(&self) -> Result<(), FieldError> {
        match self.kind {
            EventKind::Start => {
                if self.action_type.is_some() {
                    return Err(FieldError::FieldConstraint("actionType forbidden on start"));
                }
                if self.metrics.is_some() {
                    return Err(FieldError::FieldConstraint("metrics forbidden on start"));
                }
                if self.artifact_ref.is_some() {
                    return Err(FieldError::FieldConstraint("artifactRef forbidden on start"));
                }
                if self.inputs.is_empty() {
                    return Err(FieldError::FieldConstraint("inputs required nonempty on start"));
                }
                if is_empty_value(&self.params_summary) {
                    return Err(FieldError::FieldConstraint("paramsSummary required on start"));
                }
                Ok(())
            }
            EventKind::Step => {
                if self.action_type.is_none() {
                    return Err(FieldError::FieldConstraint("actionType required on step"));
                }
                if self.metrics.is_some() {
                    return Err(FieldError::FieldConstraint("metrics forbidden on step"));
                }
                if self.artifact_ref.is_some() {
                    return Err(FieldError::FieldConstraint("artifactRef forbidden on step"));
                }
                if !is_empty_value(&self.params_summary) {
                    return Err(FieldError::FieldConstraint("paramsSummary must be empty on step"));
                }
                Ok(())
            }
            EventKind::End => {
                if self.action_type.is_some() {
                    return Err(FieldError::FieldConstraint("actionType forbidden on end"));
                }
                if !self.inputs.is_empty() {
                    return Err(FieldError::FieldConstraint("inputs must be empty on end"));
                }
                if !is_empty_value(&self.params_summary) {
                    return Err(FieldError::FieldConstraint("paramsSummary must be empty on end"));
                }
                let Some(metrics) = &self.metrics else {
                    return Err(FieldError::FieldConstraint("metrics required on end"));
                };
                if !metrics.success {
                    return Err(FieldError::FieldConstraint("metrics.success must be true on end"));
                }
                if metrics.error_code.is_some() {
                    return Err(FieldError::FieldConstraint("metrics.errorCode forbidden on end"));
                }
                Ok(())
            }
            EventKind::Fail => {
                if self.action_type.is_some() {
                    return Err(FieldError::FieldConstraint("actionType forbidden on fail"));
                }
                if self.artifact_ref.is_some() {
                    return Err(FieldError::FieldConstraint("artifactRef forbidden on fail"));
                }
                if !self.inputs.is_empty() {
                    return Err(FieldError::FieldConstraint("inputs must be empty on fail"));
                }
                if !is_empty_value(&self.params_summary) {
                    return Err(FieldError::FieldConstraint("paramsSummary must be empty on fail"));
                }
                let Some(metrics) = &self.metrics else {
                    return Err(FieldError::FieldConstraint("metrics required on fail"));
                };
                if metrics.success {
                    return Err(FieldError::FieldConstraint("metrics.success must be false on fail"));
                }
                if metrics.error_code.is_none() {
                    return Err(FieldError::FieldConstraint("metrics.errorCode required on fail"));
                }
                if metrics.quality_score.is_some() {
                    return Err(FieldError::FieldConstraint(
                        "metrics.qualityScore forbidden on fail",
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(kind: EventKind, trace_id: &str) -> TraceEvent {
        TraceEvent {
            kind,
            schema_version: 1,
            trace_id: trace_id.to_string(),
            scene_id: "b".repeat(64),
            event_id: format!("{trace_id}:0"),
            policy_hash: "c".repeat(64),
            pipeline_version: "1.0.0".to_string(),
            inputs: Vec::new(),
            params_summary: Value::Null,
            action_type: None,
            metrics: None,
            artifact_ref: None,
            build_meta: Value::Null,
        }
    }

    #[test]
    fn rejects_non_unit_schema_version() {
        let trace_id = "a".repeat(64);
        let mut event = base(EventKind::Start, &trace_id);
        event.inputs.push(InputRecord {
            path: "a".to_string(),
            content_hash: "0".repeat(64),
            byte_size: 1,
        });
        event.params_summary = serde_json::json!({});
        event.schema_version = 2;
        assert_eq!(
            event.validate_fields(),
            Err(FieldError::SchemaVersionInvalid(2))
        );
    }

    #[test]
    fn valid_start_event_passes() {
        let trace_id = "a".repeat(64);
        let mut event = base(EventKind::Start, &trace_id);
        event.inputs.push(InputRecord {
            path: "a".to_string(),
            content_hash: "0".repeat(64),
            byte_size: 1,
        });
        event.params_summary = serde_json::json!({"k": "v"});
        assert_eq!(event.validate_fields(), Ok(()));
    }

    #[test]
    fn start_requires_nonempty_inputs() {
        let trace_id = "a".repeat(64);
        let mut event = base(EventKind::Start, &trace_id);
        event.params_summary = serde_json::json!({"k": "v"});
        assert!(event.validate_fields().is_err());
    }

    #[test]
    fn end_requires_success_true() {
        let trace_id = "a".repeat(64);
        let mut event = base(EventKind::End, &trace_id);
        event.metrics = Some(Metrics {
            success: false,
            error_code: None,
            quality_score: None,
        });
        assert!(event.validate_fields().is_err());
    }

    #[test]
    fn fail_requires_error_code() {
        let trace_id = "a".repeat(64);
        let mut event = base(EventKind::Fail, &trace_id);
        event.metrics = Some(Metrics {
            success: false,
            error_code: None,
            quality_score: None,
        });
        assert!(event.validate_fields().is_err());
    }

    #[test]
    fn event_id_must_reference_trace_id() {
        let trace_id = "a".repeat(64);
        let mut event = base(EventKind::Step, &trace_id);
        event.action_type = Some("scan".to_string());
        event.event_id = format!("{}:0", "f".repeat(64));
        assert_eq!(event.validate_fields(), Err(FieldError::InvalidEventId));
    }

    #[test]
    fn event_id_rejects_leading_zero() {
        let trace_id = "a".repeat(64);
        let mut event = base(EventKind::Step, &trace_id);
        event.action_type = Some("scan".to_string());
        event.event_id = format!("{trace_id}:01");
        assert_eq!(event.validate_fields(), Err(FieldError::InvalidEventId));
    }

    #[test]
    fn event_id_rejects_index_over_one_million() {
        let trace_id = "a".repeat(64);
        let mut event = base(EventKind::Step, &trace_id);
        event.action_type = Some("scan".to_string());
        event.event_id = format!("{trace_id}:1000001");
        assert_eq!(event.validate_fields(), Err(FieldError::InvalidEventId));
    }
}
