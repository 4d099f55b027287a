// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Signed NDJSON audit log (§6).

use scan_core::ident::sha256;
use serde_json::Value;
use thiserror::Error;

use crate::json::canonical_json;

/// Signs payload bytes and exposes the public key used to verify them.
/// Injected by the caller — this crate fabricates no cryptography of its
/// own, matching the pattern of [`scan_core::commit::EvidencePersistenceHandler`]
/// and [`scan_core::admission::InformationGainCalculator`].
pub trait PayloadSigner {
    /// Signs `payload`, returning an opaque signature.
    fn sign(&self, payload: &[u8]) -> Vec<u8>;
    /// The public key counterparty verifiers should use.
    fn public_key(&self) -> &[u8];
}

/// Rejects input that the canonical payload format cannot represent
/// unambiguously.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LogInputError {
    /// `eventType` or `detailsSchemaVersion` contained `\n`, `\r`, or `|`.
    #[error("field {field} contains a forbidden control character or '|'")]
    ForbiddenChar {
        /// Name of the offending field.
        field: &'static str,
    },
    /// `detailsJson` contained `\n` or `\r`.
    #[error("detailsJson contains a forbidden control character")]
    DetailsControlChar,
    /// `detailsJson` did not parse as a JSON object or array.
    #[error("detailsJson must parse as a JSON object or array")]
    DetailsNotContainer,
}

fn validate_event_type_like(field: &'static str, s: &str) -> Result<(), LogInputError> {
    if s.bytes().any(|b| b == b'\n' || b == b'\r' || b == b'|') {
        return Err(LogInputError::ForbiddenChar { field });
    }
    Ok(())
}

fn validate_details_json(details_json: &str) -> Result<(), LogInputError> {
    if details_json.bytes().any(|b| b == b'\n' || b == b'\r') {
        return Err(LogInputError::DetailsControlChar);
    }
    match serde_json::from_str::<Value>(details_json) {
        Ok(Value::Object(_) | Value::Array(_)) => Ok(()),
        _ => Err(LogInputError::DetailsNotContainer),
    }
}

/// Builds the length-prefixed, `|`-delimited canonical payload string (§6)
/// that gets signed and hashed. This is a distinct, deliberately simpler
/// separator scheme from [`crate::provenance`]'s `0x1F` scheme — `|` is
/// used here exactly as the external wire format specifies, with explicit
/// `_len=` prefixes rather than raw length bytes, because this string (not
/// its bytes alone) is itself embedded in the final JSON record.
fn canonical_payload(
    event_type: &str,
    details_schema_version: &str,
    details_json: &str,
    prev_signature: &str,
    public_key: &[u8],
) -> String {
    let pkhash = hex::encode(sha256(public_key));
    format!(
        "type_len={}|type={event_type}|dsv_len={}|dsv={details_schema_version}|details_len={}|details={details_json}|prev_len={}|prev={prev_signature}|pkhash_len={}|pkhash={pkhash}",
        event_type.len(),
        details_schema_version.len(),
        details_json.len(),
        prev_signature.len(),
        pkhash.len(),
    )
}

/// Appends signed, canonical-JSON NDJSON lines to an in-memory buffer.
/// Threads `prevSignature` from one line to the next, forming a signature
/// chain analogous to [`crate::provenance::ProvenanceChain`]'s hash chain.
pub struct SignedAuditLogWriter<'a, S: PayloadSigner> {
    signer: &'a S,
    prev_signature_hex: Option<String>,
}

impl<'a, S: PayloadSigner> SignedAuditLogWriter<'a, S> {
    /// Constructs a writer with no prior signature (the first appended
    /// line carries an empty `prevSignature`).
    #[must_use]
    pub const fn new(signer: &'a S) -> Self {
        Self {
            signer,
            prev_signature_hex: None,
        }
    }

    /// Resumes a writer whose last known signature was `prev_signature_hex`
    /// (typically recovered via [`recover_last_signature`]).
    #[must_use]
    pub const fn resuming(signer: &'a S, prev_signature_hex: Option<String>) -> Self {
        Self {
            signer,
            prev_signature_hex,
        }
    }

    /// Validates and encodes one audit event, returning the NDJSON line
    /// (without a trailing newline) to append to the log.
    pub fn encode_line(
        &mut self,
        signing_schema_version: u32,
        timestamp_millis: u64,
        event_type: &str,
        details_json: &str,
        details_schema_version: &str,
    ) -> Result<String, LogInputError> {
        validate_event_type_like("eventType", event_type)?;
        validate_event_type_like("detailsSchemaVersion", details_schema_version)?;
        validate_details_json(details_json)?;

        let prev = self.prev_signature_hex.clone().unwrap_or_default();
        let payload = canonical_payload(
            event_type,
            details_schema_version,
            details_json,
            &prev,
            self.signer.public_key(),
        );
        let payload_hash = sha256(payload.as_bytes());
        let signature = self.signer.sign(payload.as_bytes());
        let signature_hex = hex::encode(&signature);

        let record = serde_json::json!({
            "signingSchemaVersion": signing_schema_version,
            "timestamp": timestamp_millis,
            "eventType": event_type,
            "detailsJson": details_json,
            "detailsSchemaVersion": details_schema_version,
            "publicKey": hex::encode(self.signer.public_key()),
            "signature": signature_hex,
            "prevSignature": prev,
            "payloadHash": hex::encode(payload_hash),
        });

        self.prev_signature_hex = Some(signature_hex);
        Ok(canonical_json(&record))
    }
}

/// Recovers the `prevSignature` an appender should thread into its next
/// line, by scanning already-written NDJSON lines. Tail recovery: an
/// unparseable final line is tolerated (treated as if absent, yielding
/// `None` if it was the only line); a last line missing its trailing
/// newline is accepted like any other line.
#[must_use]
pub fn recover_last_signature<'a>(lines: impl Iterator<Item = &'a str>) -> Option<String> {
    let lines: Vec<&str> = lines.filter(|l| !l.is_empty()).collect();
    for line in lines.iter().rev() {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(line) {
            if let Some(Value::String(sig)) = map.get("signature") {
                return Some(sig.clone());
            }
        }
        // Unparseable or malformed — per tail-recovery semantics, only the
        // final line is tolerated; anything earlier that fails to parse is
        // a genuine corruption and is reported as "no recoverable signature".
        break;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSigner {
        key: Vec<u8>,
    }
    impl PayloadSigner for FixedSigner {
        fn sign(&self, payload: &[u8]) -> Vec<u8> {
            sha256(payload).to_vec()
        }
        fn public_key(&self) -> &[u8] {
            &self.key
        }
    }

    #[test]
    fn rejects_pipe_in_event_type() {
        let signer = FixedSigner { key: vec![1, 2, 3] };
        let mut writer = SignedAuditLogWriter::new(&signer);
        let result = writer.encode_line(1, 0, "trace|start", "{}", "1");
        assert_eq!(
            result,
            Err(LogInputError::ForbiddenChar { field: "eventType" })
        );
    }

    #[test]
    fn rejects_scalar_details_json() {
        let signer = FixedSigner { key: vec![1, 2, 3] };
        let mut writer = SignedAuditLogWriter::new(&signer);
        let result = writer.encode_line(1, 0, "trace_start", "42", "1");
        assert_eq!(result, Err(LogInputError::DetailsNotContainer));
    }

    #[test]
    fn chains_prev_signature_across_lines() {
        let signer = FixedSigner { key: vec![1, 2, 3] };
        let mut writer = SignedAuditLogWriter::new(&signer);
        let first = writer
            .encode_line(1, 0, "trace_start", "{}", "1")
            .unwrap();
        let second = writer
            .encode_line(1, 1, "trace_end", "{}", "1")
            .unwrap();
        let first_val: Value = serde_json::from_str(&first).unwrap();
        let second_val: Value = serde_json::from_str(&second).unwrap();
        assert_eq!(first_val["prevSignature"], "");
        assert_eq!(second_val["prevSignature"], first_val["signature"]);
    }

    #[test]
    fn recovers_signature_from_valid_tail_line() {
        let signer = FixedSigner { key: vec![1, 2, 3] };
        let mut writer = SignedAuditLogWriter::new(&signer);
        let line = writer
            .encode_line(1, 0, "trace_start", "{}", "1")
            .unwrap();
        let recovered = recover_last_signature(std::iter::once(line.as_str()));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(recovered, value["signature"].as_str().map(str::to_string));
    }

    #[test]
    fn tolerates_unparseable_final_line() {
        let recovered = recover_last_signature(std::iter::once("not json at all"));
        assert_eq!(recovered, None);
    }
}
