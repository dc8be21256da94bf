//! Field descriptors: name, display label, type and constraints.

use regex::Regex;

use crate::patterns;
use crate::SchemaError;

/// The type a field value is coerced to before it is sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Integer,
    Number,
    Boolean,
    /// ISO-8601 date-time string. Only the shape is checked here.
    Timestamp,
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Number)
    }
}

/// A single rule attached to a field.
///
/// Every variant carries an optional message override; `None` means the
/// engine's default wording is used.
#[derive(Debug, Clone)]
pub enum Constraint {
    Pattern { regex: Regex, message: Option<String> },
    MinLength { len: usize, message: Option<String> },
    MaxLength { len: usize, message: Option<String> },
    /// Inclusive lower bound.
    Min { value: f64, message: Option<String> },
    /// Inclusive upper bound.
    Max { value: f64, message: Option<String> },
    OneOf { values: Vec<String>, message: Option<String> },
}

impl Constraint {
    /// Evaluation order within a field. Lower runs first.
    pub fn rank(&self) -> u8 {
        match self {
            Constraint::Pattern { .. } => 0,
            Constraint::MinLength { .. } => 1,
            Constraint::MaxLength { .. } => 2,
            Constraint::Min { .. } => 3,
            Constraint::Max { .. } => 4,
            Constraint::OneOf { .. } => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Pattern { .. } => "pattern",
            Constraint::MinLength { .. } => "minLength",
            Constraint::MaxLength { .. } => "maxLength",
            Constraint::Min { .. } => "min",
            Constraint::Max { .. } => "max",
            Constraint::OneOf { .. } => "oneOf",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Constraint::Pattern { message, .. }
            | Constraint::MinLength { message, .. }
            | Constraint::MaxLength { message, .. }
            | Constraint::Min { message, .. }
            | Constraint::Max { message, .. }
            | Constraint::OneOf { message, .. } => message.as_deref(),
        }
    }

    fn set_message(&mut self, text: String) {
        match self {
            Constraint::Pattern { message, .. }
            | Constraint::MinLength { message, .. }
            | Constraint::MaxLength { message, .. }
            | Constraint::Min { message, .. }
            | Constraint::Max { message, .. }
            | Constraint::OneOf { message, .. } => *message = Some(text),
        }
    }

    fn applies_to(&self, field_type: FieldType) -> bool {
        match self {
            Constraint::Pattern { .. } | Constraint::MinLength { .. } | Constraint::MaxLength { .. } => {
                field_type != FieldType::Boolean
            }
            Constraint::Min { .. } | Constraint::Max { .. } => field_type.is_numeric(),
            Constraint::OneOf { .. } => true,
        }
    }
}

/// Declarative description of one record field.
///
/// Built with chained calls:
///
/// ```
/// use ucsb_schema::FieldDef;
///
/// let stars = FieldDef::integer("stars", "Stars").required().range(0.0, 5.0);
/// assert_eq!(stars.constraints().len(), 2);
/// ```
///
/// Construction never fails mid-chain; a malformed rule is recorded and
/// reported when the owning [`crate::EntitySchema`] is built.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    /// Human-facing name used in default messages.
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    required_message: Option<String>,
    constraints: Vec<Constraint>,
    // Last rule added, so `with_message` targets it even after reordering.
    last: Option<usize>,
    defect: Option<SchemaError>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            required: false,
            required_message: None,
            constraints: Vec::new(),
            last: None,
            defect: None,
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldType::Text)
    }

    pub fn integer(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldType::Integer)
    }

    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldType::Number)
    }

    pub fn boolean(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldType::Boolean)
    }

    pub fn timestamp(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldType::Timestamp)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark required with a custom message.
    pub fn required_message(mut self, message: impl Into<String>) -> Self {
        self.required = true;
        self.required_message = Some(message.into());
        self
    }

    /// Message reported when the field is required but empty.
    pub fn required_text(&self) -> String {
        self.required_message
            .clone()
            .unwrap_or_else(|| format!("{} is required.", self.label))
    }

    pub fn pattern(self, source: &str) -> Self {
        match Regex::new(source) {
            Ok(regex) => self.constraint(Constraint::Pattern { regex, message: None }),
            Err(e) => {
                let name = self.name.clone();
                self.defective(SchemaError::InvalidPattern {
                    field: name,
                    message: e.to_string(),
                })
            }
        }
    }

    pub fn email(self) -> Self {
        self.pattern(patterns::EMAIL)
    }

    pub fn identifier(self) -> Self {
        self.pattern(patterns::IDENTIFIER)
    }

    pub fn url(self) -> Self {
        self.pattern(patterns::URL)
    }

    pub fn min_length(self, len: usize) -> Self {
        self.constraint(Constraint::MinLength { len, message: None })
    }

    pub fn max_length(self, len: usize) -> Self {
        self.constraint(Constraint::MaxLength { len, message: None })
    }

    pub fn min(self, value: f64) -> Self {
        self.constraint(Constraint::Min { value, message: None })
    }

    pub fn max(self, value: f64) -> Self {
        self.constraint(Constraint::Max { value, message: None })
    }

    /// Inclusive numeric range.
    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    pub fn one_of<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.constraint(Constraint::OneOf { values, message: None })
    }

    /// Override the message of the most recently added rule.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        match self.last {
            Some(idx) => {
                self.constraints[idx].set_message(message.into());
                self
            }
            None => {
                let name = self.name.clone();
                self.defective(SchemaError::DanglingMessage { field: name })
            }
        }
    }

    /// Constraints in evaluation order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub(crate) fn defect(&self) -> Option<&SchemaError> {
        self.defect.as_ref()
    }

    fn constraint(mut self, constraint: Constraint) -> Self {
        if !constraint.applies_to(self.field_type) {
            let name = self.name.clone();
            return self.defective(SchemaError::InapplicableConstraint {
                field: name,
                constraint: constraint.name(),
            });
        }
        let rank = constraint.rank();
        let idx = self
            .constraints
            .iter()
            .position(|c| c.rank() > rank)
            .unwrap_or(self.constraints.len());
        self.constraints.insert(idx, constraint);
        self.last = Some(idx);
        self
    }

    fn defective(mut self, err: SchemaError) -> Self {
        self.defect.get_or_insert(err);
        self
    }
}
