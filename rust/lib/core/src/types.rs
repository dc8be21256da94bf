use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An entity record: field name to scalar JSON value.
///
/// Records are schema-less at this layer; the validation engine decides
/// which fields are meaningful and what type each one has.
pub type Record = serde_json::Map<String, Value>;

/// Server-assigned identity of a record.
///
/// Most entities use a numeric `id`; organizations use the natural key
/// `orgCode`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Id(i64),
    Code(String),
}

impl RecordKey {
    /// Read a key out of a JSON value. Numeric strings become `Id` only
    /// when `numeric` is set, so natural keys like `"007"` stay intact.
    pub fn from_value(value: &Value, numeric: bool) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(RecordKey::Id),
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) if numeric => s.trim().parse().ok().map(RecordKey::Id),
            Value::String(s) => Some(RecordKey::Code(s.clone())),
            _ => None,
        }
    }

    /// The key as a JSON value, for request bodies.
    pub fn to_value(&self) -> Value {
        match self {
            RecordKey::Id(id) => Value::from(*id),
            RecordKey::Code(code) => Value::from(code.clone()),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Id(id) => write!(f, "{id}"),
            RecordKey::Code(code) => f.write_str(code),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(id: i64) -> Self {
        RecordKey::Id(id)
    }
}

impl From<&str> for RecordKey {
    fn from(code: &str) -> Self {
        RecordKey::Code(code.to_string())
    }
}

/// Render a scalar JSON value as a query-parameter string.
///
/// Returns `None` for `null`, arrays and objects, which have no
/// query-string form.
pub fn param_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Merge a patch into a base record.
///
/// For each key in `patch`:
/// - If the value is `null`, the key is removed from `base`.
/// - Otherwise, the key is set to the patch value.
///
/// Records are flat, so this is RFC 7386 restricted to one level.
pub fn merge_patch(base: &mut Record, patch: &Record) {
    for (key, value) in patch {
        if value.is_null() {
            base.remove(key);
        } else {
            base.insert(key.clone(), value.clone());
        }
    }
}
