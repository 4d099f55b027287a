// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic `traceId`/`sceneId` derivation (§4.10).

use scan_core::ident::{sha256, to_hex, Hash};
use serde_json::Value;

use crate::json::canonical_json;

/// One scene input: a file path paired with its content hash and size.
///
/// `byteSize` and `contentHash` are carried for the audit record but are
/// ignored by `sceneId` derivation — only the sorted path list feeds that
/// hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    /// Path of the input, as recorded by the caller.
    pub path: String,
    /// Hex-encoded content hash of the input.
    pub content_hash: String,
    /// Size of the input in bytes.
    pub byte_size: u64,
}

/// `sceneId = SHA-256(sorted(inputPaths) joined by '\n')`.
///
/// Path order is otherwise unspecified by the caller's collection, so the
/// paths are sorted before hashing to make the result order-independent.
#[must_use]
pub fn scene_id(input_paths: &[String]) -> Hash {
    let mut sorted: Vec<&str> = input_paths.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sha256(sorted.join("\n").as_bytes())
}

/// `traceId = SHA-256(policyHash | pipelineVersion | sorted(paramsSummary) | sorted(inputs by (path, contentHash)))`.
///
/// The fields are length-prefixed (little-endian `u32`) and separated by
/// the ASCII unit separator (`0x1F`) before concatenation, so that no byte
/// sequence occurring inside one field can be mistaken for a field
/// boundary — the same scheme used by [`crate::provenance::ProvenanceChain`].
/// `paramsSummary` is encoded with the canonical JSON encoder, whose
/// object-key sort already satisfies "sorted(paramsSummary)"; `inputs` is
/// explicitly sorted by `(path, contentHash)` before being encoded as a
/// canonical JSON array.
#[must_use]
pub fn trace_id(
    policy_hash: &Hash,
    pipeline_version: &str,
    params_summary: &Value,
    inputs: &[InputRecord],
) -> Hash {
    let mut sorted_inputs = inputs.to_vec();
    sorted_inputs.sort_by(|a, b| (&a.path, &a.content_hash).cmp(&(&b.path, &b.content_hash)));
    let inputs_json = Value::Array(
        sorted_inputs
            .iter()
            .map(|i| {
                serde_json::json!({
                    "path": i.path,
                    "contentHash": i.content_hash,
                    "byteSize": i.byte_size,
                })
            })
            .collect(),
    );

    let mut buf = Vec::new();
    buf.extend_from_slice(policy_hash);
    push_field(&mut buf, pipeline_version.as_bytes());
    push_field(&mut buf, canonical_json(params_summary).as_bytes());
    push_field(&mut buf, canonical_json(&inputs_json).as_bytes());
    sha256(&buf)
}

fn push_field(buf: &mut Vec<u8>, field: &[u8]) {
    buf.push(0x1F);
    #[allow(clippy::cast_possible_truncation)]
    let len = field.len() as u32;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(field);
}

/// Renders a derived id as the 64-lowercase-hex wire form (§3).
#[must_use]
pub fn hex_id(hash: &Hash) -> String {
    to_hex(hash)
}
