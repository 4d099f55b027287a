// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical JSON encoder (§4.10).
//!
//! Object keys sorted by UTF-8 byte lexicographic order, no insignificant
//! whitespace, forward slash left unescaped. Relies on `serde_json::Map`
//! being `BTreeMap`-backed (the `preserve_order` feature is never enabled
//! in this workspace) so key sort order falls out of iteration for free;
//! everything else — string escaping, separators — is written by hand
//! because `serde_json`'s own `Serializer` does not match this wire format
//! byte-for-byte (it lowercases `\u00xx` escapes; this contract requires
//! uppercase).

use serde_json::Value;

/// Encodes `value` as canonical JSON bytes.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, val)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(val, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_byte_lexicographically() {
        let value = json!({"b": 1, "a": 2, "ab": 3});
        assert_eq!(canonical_json(&value), r#"{"a":2,"ab":3,"b":1}"#);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let value = json!({"x": [1, 2, 3]});
        assert_eq!(canonical_json(&value), r#"{"x":[1,2,3]}"#);
    }

    #[test]
    fn control_chars_use_uppercase_hex_escapes() {
        let value = Value::String("a\u{1}b".to_string());
        assert_eq!(canonical_json(&value), r#""ab""#);
    }

    #[test]
    fn forward_slash_is_not_escaped() {
        let value = Value::String("a/b".to_string());
        assert_eq!(canonical_json(&value), r#""a/b""#);
    }

    #[test]
    fn standard_escapes_are_used() {
        let value = Value::String("line\nbreak\ttab\"quote\\back".to_string());
        assert_eq!(
            canonical_json(&value),
            r#""line\nbreak\ttab\"quote\\back""#
        );
    }
}
