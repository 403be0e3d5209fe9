//! Canonicalization of aspect/field values for equality testing and submit.
//!
//! Aspect values arrive as strings that may hold stringified JSON. Two
//! representations of the same structured value (whitespace, key order) must
//! compare equal, and the submitted payload must carry the parsed form.

/// Outcome of resolving a raw textual value into its submit form.
///
/// `Unset` means the field was never provided anywhere (no draft, no
/// baseline) and must be skipped. An explicit JSON `null` is NOT `Unset`;
/// it resolves to `Value(Null)` and means "clear the field".
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ResolvedValue {
    Unset,
    Value(serde_json::Value),
}

impl ResolvedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(serde_json::Value::Null))
    }
}

/// Canonical comparison form of a raw value.
///
/// Absent stays absent. Whitespace-only trims to the canonical empty string.
/// Values that parse as JSON reserialize canonically (serde_json's default
/// `Value` keeps object keys sorted), so `{"a":1, "b":2}` and `{"b":2,"a":1}`
/// compare equal. Anything else is compared as the trimmed string.
///
/// Never stored, never submitted.
pub(crate) fn normalize_for_comparison(value: Option<&str>) -> Option<String> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(String::new());
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(parsed) => {
            Some(serde_json::to_string(&parsed).unwrap_or_else(|_| trimmed.to_string()))
        }
        // Plain strings are not valid JSON documents; compare them as-is.
        Err(_) => Some(trimmed.to_string()),
    }
}

/// Resolve a raw value into the form that goes into a patch payload.
///
/// Same parsing rules as [`normalize_for_comparison`], but the parsed value is
/// returned instead of a reserialized string. An empty string resolves to the
/// JSON string `""`, a valid non-null value.
pub(crate) fn resolve_value(value: Option<&str>) -> ResolvedValue {
    let Some(raw) = value else {
        return ResolvedValue::Unset;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ResolvedValue::Value(serde_json::Value::String(String::new()));
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(parsed) => ResolvedValue::Value(parsed),
        Err(_) => ResolvedValue::Value(serde_json::Value::String(trimmed.to_string())),
    }
}
