//! JSON framing: each line is handed to a strict JSON parser on its own;
//! a malformed line yields `Value::Null` rather than aborting the batch,
//! so a noisy trace still returns everything parseable.
//!
//! The dynamic value tree itself is `serde_json::Value` wrapped in a
//! thin newtype so the crate can attach the `parse_line` constructor
//! without taking on the orphan-rule workarounds a free function would
//! need; `Deref` gives callers the full map-like/array-like/iterator
//! surface of the wrapped value for free.

use std::ops::Deref;

use serde_json::Value;

/// One line of a trace, parsed as JSON. Map-like and array-like lookup
/// and iteration are available through `Deref<Target = serde_json::Value>`;
/// `is_null()` additionally distinguishes a line that parsed to the
/// literal JSON `null` from one that failed to parse, which also
/// becomes `Null` rather than surfacing a parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonValue(Value);

impl JsonValue {
    pub(crate) fn parse_line(line: &[u8]) -> Self {
        match serde_json::from_slice(line) {
            Ok(v) => JsonValue(v),
            Err(e) => {
                tracing::warn!(error = %e, "malformed JSON line, substituting null");
                JsonValue(Value::Null)
            }
        }
    }

    /// The underlying parsed value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the wrapper, returning the underlying parsed value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Deref for JsonValue {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Value {
        v.0
    }
}
