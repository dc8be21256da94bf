//! Entity schema: the ordered field list for one record type.

use std::collections::HashSet;

use crate::{FieldDef, SchemaError};

/// The identifier field of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDef {
    pub name: String,
    /// Numeric server-assigned id (`true`) or natural string key (`false`).
    pub numeric: bool,
}

impl KeyDef {
    /// The conventional numeric `id` key.
    pub fn id() -> Self {
        Self { name: "id".into(), numeric: true }
    }

    /// A natural string key such as `orgCode`.
    pub fn natural(name: impl Into<String>) -> Self {
        Self { name: name.into(), numeric: false }
    }
}

/// Ordered field descriptors for a record type.
///
/// Field order determines validation-error order and form order.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    key: KeyDef,
    fields: Vec<FieldDef>,
}

impl EntitySchema {
    /// Build a schema, surfacing any malformed rule recorded on a field.
    pub fn new(name: impl Into<String>, key: KeyDef, fields: Vec<FieldDef>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if let Some(err) = field.defect() {
                return Err(err.clone());
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField { name: field.name.clone() });
            }
        }
        Ok(Self { name: name.into(), key, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &KeyDef {
        &self.key
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of required fields, in schema order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.required).map(|f| f.name.as_str())
    }

    /// Whether the key is also an editable field (natural keys are).
    pub fn key_is_field(&self) -> bool {
        self.field(&self.key.name).is_some()
    }
}
