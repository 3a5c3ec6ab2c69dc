//! Bridge between [`Value`] and `serde_json::Value`.
//!
//! Lets callers feed documents produced elsewhere into the codec and compare
//! its output against `serde_json`. Object member order is preserved in both
//! directions (`serde_json` is built with `preserve_order`).

use crate::error::Result;
use crate::stringifier::stringify;
use crate::value::{List, Object, Value};

impl From<&serde_json::Value> for Value {
    /// Numbers become `f64`; lists and objects are freshly allocated.
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::str(s),
            serde_json::Value::Array(items) => {
                Value::List(List::from_vec(items.iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => Value::Object(Object::from_entries(
                map.iter().map(|(k, v)| (k.as_str(), Value::from(v))),
            )),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}

/// Convert a value graph to `serde_json::Value`.
///
/// Goes through [`stringify`], so `toJSON`, declared members, omission rules
/// and cycle detection behave exactly as they do for text output. Returns
/// `Ok(None)` when the root is omitted.
///
/// `serde_json` strings are UTF-8, so lone surrogates in keys or string values
/// are replaced with U+FFFD. Use [`stringify`] to keep the exact code units.
pub fn to_serde_json(value: &Value) -> Result<Option<serde_json::Value>> {
    match stringify(value, &Value::Undefined, &Value::Undefined)? {
        Some(text) => Ok(Some(serde_json::from_str(&text.to_string_lossy())?)),
        None => Ok(None),
    }
}
