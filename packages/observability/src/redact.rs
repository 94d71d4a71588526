//! Secret redaction for structured log fields.
//!
//! Applied to every JSONL entry before it is written. Keys are matched by
//! substring against a denylist; values are matched by shape (bearer
//! headers, three-segment JWTs, long opaque hex/base64 blobs).

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Replacement written in place of a redacted value.
pub const REDACTED: &str = "[REDACTED]";

const DENYLIST_KEYS: [&str; 8] = [
    "token",
    "authorization",
    "cookie",
    "password",
    "secret",
    "plaintext",
    "credential",
    "code",
];

/// Redact every sensitive field in a field map.
pub fn sanitize_fields(fields: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    fields
        .into_iter()
        .map(|(k, v)| {
            let v = sanitize_value(&k, &v);
            (k, v)
        })
        .collect()
}

/// Redact a free-form message if it is itself a secret-shaped string.
pub fn sanitize_message(message: &str) -> String {
    if looks_like_sensitive_value(message) {
        REDACTED.to_string()
    } else {
        message.to_string()
    }
}

fn sanitize_value(key: &str, value: &Value) -> Value {
    if is_sensitive_key(key) {
        return Value::String(REDACTED.to_string());
    }

    match value {
        Value::String(s) if looks_like_sensitive_value(s) => Value::String(REDACTED.to_string()),
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), sanitize_value(k, v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|i| sanitize_value(key, i)).collect()),
        _ => value.clone(),
    }
}

/// Whether a field key names something that must never be logged verbatim.
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    // Diagnostics about a secret, not the secret: `status_code`, `token_id`,
    // `has_token`.
    if lower.ends_with("_code") || lower.ends_with("_id") || lower.starts_with("has_") {
        return false;
    }
    DENYLIST_KEYS.iter().any(|entry| lower.contains(entry))
}

/// Whether a value looks like a bearer credential regardless of its key.
pub fn looks_like_sensitive_value(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("bearer ") {
        return true;
    }
    if looks_like_jwt(raw) {
        return true;
    }
    is_long_hex(raw) || is_long_base64(raw)
}

fn looks_like_jwt(raw: &str) -> bool {
    let segments: Vec<&str> = raw.split('.').collect();
    segments.len() == 3
        && raw.len() > 40
        && segments.iter().all(|s| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '=')
        })
}

fn is_long_hex(value: &str) -> bool {
    value.len() > 48 && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_long_base64(value: &str) -> bool {
    value.len() > 48
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=' || c == '_' || c == '-')
}
