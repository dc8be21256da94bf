//! Schema construction errors.

use thiserror::Error;

/// A schema definition is malformed. Raised when the schema is built,
/// never while validating records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Two fields share a name.
    #[error("duplicate field name: {name}")]
    DuplicateField { name: String },

    /// A pattern constraint does not compile.
    #[error("invalid pattern on field '{field}': {message}")]
    InvalidPattern { field: String, message: String },

    /// A constraint does not make sense for the field type.
    #[error("constraint '{constraint}' is not applicable to field '{field}'")]
    InapplicableConstraint { field: String, constraint: &'static str },

    /// `with_message` was called before any rule was added.
    #[error("field '{field}' has no rule to attach a message to")]
    DanglingMessage { field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchemaError::DuplicateField { name: "teamId".into() };
        assert_eq!(err.to_string(), "duplicate field name: teamId");

        let err = SchemaError::InvalidPattern {
            field: "teamId".into(),
            message: "unclosed group".into(),
        };
        assert!(err.to_string().contains("teamId"));
        assert!(err.to_string().contains("unclosed group"));
    }
}
