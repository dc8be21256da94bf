//! Entity definitions: schema plus request shaping.
//!
//! One [`EntityDef`] per record type drives every controller operation.
//! Differences between entities (timestamp suffixes, whether the key
//! repeats in the update body, notification wording) are data here, not
//! code paths.

use std::sync::Arc;

use serde_json::{Map, Value};
use ucsb_client::{Method, Request, cache_key};
use ucsb_core::{RecordKey, param_string};
use ucsb_flux::MutationDescriptor;
use ucsb_schema::{EntitySchema, FieldDef, FieldErrors, KeyDef, SchemaError, ValidatedRecord};

use crate::normalize::TimestampSuffix;

#[derive(Debug)]
pub struct EntityDef {
    name: &'static str,
    base: &'static str,
    list_route: &'static str,
    aliases: Vec<&'static str>,
    schema: Arc<EntitySchema>,
    /// Schema used by delete: just the key, required.
    key_schema: Arc<EntitySchema>,
    suffixes: Vec<(&'static str, TimestampSuffix)>,
    key_in_update_body: bool,
    created: &'static str,
    updated: &'static str,
}

impl EntityDef {
    /// Build a definition. `base` is the API path without a trailing slash.
    pub fn new(
        name: &'static str,
        base: &'static str,
        list_route: &'static str,
        key: KeyDef,
        fields: Vec<FieldDef>,
    ) -> Result<Self, SchemaError> {
        let schema = EntitySchema::new(name, key.clone(), fields)?;
        let key_field = match schema.field(&key.name) {
            Some(field) => FieldDef::new(field.name.clone(), field.label.clone(), field.field_type).required(),
            None => FieldDef::integer(key.name.clone(), "Id").required(),
        };
        let key_schema = EntitySchema::new(format!("{name} key"), key, vec![key_field])?;
        Ok(Self {
            name,
            base,
            list_route,
            aliases: Vec::new(),
            schema: Arc::new(schema),
            key_schema: Arc::new(key_schema),
            suffixes: Vec::new(),
            key_in_update_body: false,
            created: "",
            updated: "",
        })
    }

    pub fn alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    /// Send `field` with a `Z` suffix on create and update.
    pub fn zulu(mut self, field: &'static str) -> Self {
        self.suffixes.push((field, TimestampSuffix::Zulu));
        self
    }

    /// Repeat the key inside the update body as well as the query string.
    pub fn key_in_update_body(mut self) -> Self {
        self.key_in_update_body = true;
        self
    }

    /// Notification templates. `{field}` is replaced from the response body.
    pub fn messages(mut self, created: &'static str, updated: &'static str) -> Self {
        self.created = created;
        self.updated = updated;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn base(&self) -> &'static str {
        self.base
    }

    /// Where a successful create or update navigates.
    pub fn list_route(&self) -> &'static str {
        self.list_route
    }

    pub fn aliases(&self) -> &[&'static str] {
        &self.aliases
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    pub fn key_schema(&self) -> &Arc<EntitySchema> {
        &self.key_schema
    }

    pub fn key(&self) -> &KeyDef {
        self.schema.key()
    }

    /// Whether `name` refers to this entity. Case, `-` and `_` are ignored.
    pub fn matches(&self, name: &str) -> bool {
        let wanted = fold(name);
        fold(self.name) == wanted || self.aliases.iter().any(|a| fold(a) == wanted)
    }

    /// Parse a key typed by a user.
    pub fn parse_key(&self, raw: &str) -> Option<RecordKey> {
        RecordKey::from_value(&Value::from(raw), self.key().numeric)
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn collection_key(&self) -> String {
        format!("{}/all", self.base)
    }

    pub fn singleton_key(&self, key: &RecordKey) -> String {
        cache_key(self.base, &[(self.key().name.clone(), key.to_string())])
    }

    pub fn list_request(&self) -> Request {
        Request::get(self.collection_key())
    }

    pub fn get_request(&self, key: &RecordKey) -> Request {
        Request::get(self.base).param(self.key().name.clone(), key.to_string())
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// `POST <base>/post` with every field as a query parameter.
    pub fn describe_create(&self, record: &ValidatedRecord) -> Result<MutationDescriptor, FieldErrors> {
        let mut descriptor = MutationDescriptor::new(Method::Post, format!("{}/post", self.base));
        for (field, value) in self.outgoing(record) {
            if let Some(text) = param_string(&value) {
                descriptor = descriptor.param(field, text);
            }
        }
        Ok(descriptor.invalidate(self.collection_key()))
    }

    /// `PUT <base>?<key>=..` with the remaining fields as a JSON body.
    pub fn describe_update(&self, record: &ValidatedRecord) -> Result<MutationDescriptor, FieldErrors> {
        let key = self.require_key(record)?;
        let key_name = &self.key().name;

        let mut body = Map::new();
        if self.key_in_update_body {
            body.insert(key_name.clone(), key.to_value());
        }
        for (field, value) in self.outgoing(record) {
            if field != *key_name {
                body.insert(field, value);
            }
        }
        Ok(MutationDescriptor::new(Method::Put, self.base)
            .param(key_name.clone(), key.to_string())
            .body(Value::Object(body))
            .invalidate(self.singleton_key(&key))
            .invalidate(self.collection_key()))
    }

    /// `DELETE <base>?<key>=..`.
    pub fn describe_delete(&self, record: &ValidatedRecord) -> Result<MutationDescriptor, FieldErrors> {
        let key = self.require_key(record)?;
        Ok(MutationDescriptor::new(Method::Delete, self.base)
            .param(self.key().name.clone(), key.to_string())
            .invalidate(self.singleton_key(&key))
            .invalidate(self.collection_key()))
    }

    // ── Notifications ───────────────────────────────────────────────

    pub fn created_message(&self, body: &Value) -> String {
        render(self.created, body)
    }

    pub fn updated_message(&self, body: &Value) -> String {
        render(self.updated, body)
    }

    /// The server's own message when it sends one.
    pub fn deleted_message(&self, body: &Value, key: &RecordKey) -> String {
        match body {
            Value::String(text) if !text.is_empty() => text.clone(),
            _ => body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} with {} {} deleted", self.name, self.key().name, key)),
        }
    }

    fn suffix_for(&self, field: &str) -> TimestampSuffix {
        self.suffixes
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, suffix)| *suffix)
            .unwrap_or_default()
    }

    /// Validated fields in schema order, with suffixes applied.
    fn outgoing(&self, record: &ValidatedRecord) -> Vec<(String, Value)> {
        record
            .iter()
            .map(|(field, value)| {
                let value = match value {
                    Value::String(text) => Value::String(self.suffix_for(field).apply(text)),
                    other => other.clone(),
                };
                (field.to_string(), value)
            })
            .collect()
    }

    fn require_key(&self, record: &ValidatedRecord) -> Result<RecordKey, FieldErrors> {
        record.key().cloned().ok_or_else(|| {
            let mut errors = FieldErrors::new();
            let key_name = &self.key().name;
            let message = self
                .key_schema
                .field(key_name)
                .map(FieldDef::required_text)
                .unwrap_or_else(|| format!("{key_name} is required."));
            errors.insert(key_name.clone(), message);
            errors
        })
    }
}

fn fold(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Replace `{field}` placeholders with values from `body`.
fn render(template: &str, body: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let value = body.get(&after[..close]).and_then(param_string).unwrap_or_default();
        out.push_str(&value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ucsb_core::Record;
    use ucsb_schema::validate;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    fn review() -> EntityDef {
        EntityDef::new(
            "MenuItemReview",
            "/api/menuitemreview",
            "/menuitemreview",
            KeyDef::id(),
            vec![
                FieldDef::integer("itemId", "Item Id").required(),
                FieldDef::timestamp("dateReviewed", "Date Reviewed").required(),
                FieldDef::text("comments", "Comments"),
            ],
        )
        .unwrap()
        .alias("reviews")
        .zulu("dateReviewed")
        .messages("New review - id: {id} itemId: {itemId}", "Review {id} updated")
    }

    #[test]
    fn keys_and_reads() {
        let def = review();
        assert_eq!(def.collection_key(), "/api/menuitemreview/all");
        assert_eq!(def.singleton_key(&RecordKey::Id(3)), "/api/menuitemreview?id=3");
        assert_eq!(def.list_request().cache_key(), def.collection_key());
        assert_eq!(def.get_request(&RecordKey::Id(3)).cache_key(), "/api/menuitemreview?id=3");
    }

    #[test]
    fn matching_ignores_case_and_separators() {
        let def = review();
        assert!(def.matches("MenuItemReview"));
        assert!(def.matches("menu-item_review"));
        assert!(def.matches("Reviews"));
        assert!(!def.matches("articles"));
    }

    #[test]
    fn create_sends_params_with_suffix() {
        let def = review();
        let v = validate(
            def.schema(),
            &record(json!({"itemId": "27", "dateReviewed": "2022-01-02T12:00", "comments": ""})),
        )
        .unwrap();
        let d = def.describe_create(&v).unwrap();
        assert_eq!(d.method, Method::Post);
        assert_eq!(d.endpoint, "/api/menuitemreview/post");
        assert_eq!(
            d.params,
            vec![
                ("itemId".to_string(), "27".to_string()),
                ("dateReviewed".to_string(), "2022-01-02T12:00Z".to_string()),
            ]
        );
        assert_eq!(d.body, None);
        assert_eq!(d.invalidates, vec!["/api/menuitemreview/all".to_string()]);
    }

    #[test]
    fn update_needs_a_key() {
        let def = review();
        let v = validate(def.schema(), &record(json!({"itemId": 1, "dateReviewed": "2022-01-02T12:00"}))).unwrap();
        let errors = def.describe_update(&v).unwrap_err();
        assert_eq!(errors.get("id"), Some("Id is required."));

        let v = validate(
            def.schema(),
            &record(json!({"id": 3, "itemId": 1, "dateReviewed": "2022-01-02T12:00"})),
        )
        .unwrap();
        let d = def.describe_update(&v).unwrap();
        assert_eq!(d.params, vec![("id".to_string(), "3".to_string())]);
        assert_eq!(d.body, Some(json!({"itemId": 1, "dateReviewed": "2022-01-02T12:00Z"})));
        assert_eq!(
            d.invalidates,
            vec!["/api/menuitemreview?id=3".to_string(), "/api/menuitemreview/all".to_string()]
        );
    }

    #[test]
    fn delete_uses_key_schema() {
        let def = review();
        let v = validate(def.key_schema(), &record(json!({"id": "3"}))).unwrap();
        let d = def.describe_delete(&v).unwrap();
        assert_eq!(d.method, Method::Delete);
        assert_eq!(d.endpoint, "/api/menuitemreview");
        assert_eq!(d.params, vec![("id".to_string(), "3".to_string())]);
        assert_eq!(d.invalidates.len(), 2);

        let errors = validate(def.key_schema(), &record(json!({}))).unwrap_err();
        assert_eq!(errors.get("id"), Some("Id is required."));
    }

    #[test]
    fn messages_render_from_body() {
        let def = review();
        assert_eq!(
            def.created_message(&json!({"id": 9, "itemId": 27})),
            "New review - id: 9 itemId: 27"
        );
        assert_eq!(def.updated_message(&json!({})), "Review  updated");
        assert_eq!(
            def.deleted_message(&json!({"message": "MenuItemReview with id 3 deleted"}), &RecordKey::Id(3)),
            "MenuItemReview with id 3 deleted"
        );
        assert_eq!(
            def.deleted_message(&Value::Null, &RecordKey::Id(3)),
            "MenuItemReview with id 3 deleted"
        );
    }

    #[test]
    fn render_leaves_unclosed_braces() {
        assert_eq!(render("a {b", &json!({"b": 1})), "a {b");
        assert_eq!(render("{x}-{y}", &json!({"x": "p", "y": true})), "p-true");
    }
}
