//! The validation engine.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Number, Value};

use ucsb_core::{Record, RecordKey};

use crate::field::{Constraint, FieldDef, FieldType};
use crate::schema::EntitySchema;
use crate::timestamp;

// ── FieldErrors ─────────────────────────────────────────────────────

/// Field name to human-readable message, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error. The first message for a field is kept.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names in schema order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

// ── ValidatedRecord ─────────────────────────────────────────────────

/// A record that passed validation, coerced to the schema's types.
///
/// Fields appear in schema order. Optional fields left empty are absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRecord {
    #[serde(skip)]
    key: Option<RecordKey>,
    #[serde(flatten)]
    values: IndexMap<String, Value>,
}

impl ValidatedRecord {
    /// The record's identifier, if the input carried one.
    pub fn key(&self) -> Option<&RecordKey> {
        self.key.as_ref()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// String form of a field, for messages and query parameters.
    pub fn get_str(&self, field: &str) -> Option<String> {
        self.values.get(field).and_then(ucsb_core::param_string)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert back into a plain record, including the key when present.
    pub fn into_record(self, key_name: &str) -> Record {
        let mut record = Record::new();
        if let Some(key) = &self.key {
            record.insert(key_name.to_string(), key.to_value());
        }
        record.extend(self.values);
        record
    }
}

// ── Engine ──────────────────────────────────────────────────────────

/// Validate `record` against `schema`.
///
/// Returns every field error at once, keyed by field name in schema order.
/// Fields not declared by the schema are dropped from the output.
pub fn validate(schema: &EntitySchema, record: &Record) -> Result<ValidatedRecord, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut values = IndexMap::new();

    for field in schema.fields() {
        let raw = record.get(&field.name).filter(|v| !is_empty(v));
        let Some(raw) = raw else {
            if field.required {
                errors.insert(&field.name, field.required_text());
            }
            continue;
        };
        match check_field(field, raw) {
            Ok(value) => {
                values.insert(field.name.clone(), value);
            }
            Err(message) => errors.insert(&field.name, message),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let key_def = schema.key();
    let key = values
        .get(&key_def.name)
        .or_else(|| record.get(&key_def.name))
        .and_then(|v| RecordKey::from_value(v, key_def.numeric));

    Ok(ValidatedRecord { key, values })
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Coerce one present value, then run its constraints in order.
fn check_field(field: &FieldDef, raw: &Value) -> Result<Value, String> {
    let value = coerce(field, raw)?;
    let text = match &value {
        Value::String(s) => s.clone(),
        other => ucsb_core::param_string(other).unwrap_or_default(),
    };
    let number = value.as_f64();

    for constraint in field.constraints() {
        let ok = match constraint {
            Constraint::Pattern { regex, .. } => regex.is_match(&text),
            Constraint::MinLength { len, .. } => text.chars().count() >= *len,
            Constraint::MaxLength { len, .. } => text.chars().count() <= *len,
            Constraint::Min { value: min, .. } => number.is_some_and(|n| n >= *min),
            Constraint::Max { value: max, .. } => number.is_some_and(|n| n <= *max),
            Constraint::OneOf { values, .. } => values.iter().any(|v| *v == text),
        };
        if !ok {
            return Err(constraint
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| default_message(field, constraint)));
        }
    }
    Ok(value)
}

fn coerce(field: &FieldDef, raw: &Value) -> Result<Value, String> {
    let label = &field.label;
    match field.field_type {
        FieldType::Text => Ok(match raw {
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(ucsb_core::param_string(other).unwrap_or_default()),
        }),
        FieldType::Timestamp => match raw.as_str() {
            Some(s) if timestamp::is_datetime(s) => Ok(Value::String(s.trim().to_string())),
            _ => Err(format!("{label} must be a date-time like YYYY-MM-DDTHH:MM:SS.")),
        },
        FieldType::Boolean => match raw {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(format!("{label} must be true or false.")),
        },
        FieldType::Integer => {
            let n = to_f64(raw).ok_or_else(|| format!("{label} must be a number."))?;
            if n.fract() != 0.0 || n.abs() > i64::MAX as f64 {
                return Err(format!("{label} must be a whole number."));
            }
            Ok(Value::from(n as i64))
        }
        FieldType::Number => {
            let n = to_f64(raw).ok_or_else(|| format!("{label} must be a number."))?;
            Number::from_f64(n)
                .map(Value::Number)
                .ok_or_else(|| format!("{label} must be a number."))
        }
    }
}

fn to_f64(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn default_message(field: &FieldDef, constraint: &Constraint) -> String {
    let label = &field.label;
    match constraint {
        Constraint::Pattern { .. } => format!("{label} is not in a valid format."),
        Constraint::MinLength { len, .. } => format!("{label} must be at least {len} characters."),
        Constraint::MaxLength { len, .. } => format!("{label} must be at most {len} characters."),
        Constraint::Min { value, .. } => format!("{label} must be at least {}", fmt_bound(*value)),
        Constraint::Max { value, .. } => format!("{label} must be at most {}", fmt_bound(*value)),
        Constraint::OneOf { values, .. } => format!("{label} must be one of: {}.", values.join(", ")),
    }
}

fn fmt_bound(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
