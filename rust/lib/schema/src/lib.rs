//! Entity schemas and the validation engine.
//!
//! Each entity declares an ordered list of [`FieldDef`]s. One engine,
//! [`validate`], evaluates any schema against a candidate record:
//!
//! - Fields are checked in schema order; errors come back in that order.
//! - A missing required field reports `"<Label> is required."` and skips
//!   the rest of that field's rules.
//! - Constraints run pattern → min length → max length → numeric min →
//!   numeric max → allowed values. The first failure wins.
//! - All field errors are returned together, never just the first.
//!
//! On success the record is coerced to the declared field types so it can
//! be sent to the backend as-is.

pub mod error;
pub mod field;
pub mod patterns;
pub mod schema;
pub mod timestamp;
pub mod validate;

pub use error::SchemaError;
pub use field::{Constraint, FieldDef, FieldType};
pub use schema::{EntitySchema, KeyDef};
pub use validate::{FieldErrors, ValidatedRecord, validate};
