//! Error types for the plandiff engine.

use thiserror::Error;

/// All possible errors from the plandiff engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Shape errors
    #[error("shape mismatch at '{path}': expected {expected}, got {got}")]
    ShapeMismatch {
        path: String,
        expected: String,
        got: String,
    },

    #[error("field not declared in schema: {0}")]
    UnknownField(String),

    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    // Merge errors
    #[error("retain names must be lowercase declared field names: {0:?}")]
    InvalidRetainName(Vec<String>),

    #[error("invalid json tree: {0}")]
    InvalidJson(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UnknownField("zone_id".into());
        assert_eq!(err.to_string(), "field not declared in schema: zone_id");

        let err = Error::ShapeMismatch {
            path: "replication_specs[0]".into(),
            expected: "record".into(),
            got: "leaf".into(),
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch at 'replication_specs[0]': expected record, got leaf"
        );

        let err = Error::TypeMismatch {
            field: "node_count".into(),
            expected: "Int".into(),
            got: "String".into(),
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for field 'node_count': expected Int, got String"
        );

        let err = Error::InvalidRetainName(vec!["ZoneName".into()]);
        assert_eq!(
            err.to_string(),
            "retain names must be lowercase declared field names: [\"ZoneName\"]"
        );
    }
}
