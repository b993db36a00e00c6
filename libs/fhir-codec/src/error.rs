//! Codec error types
//!
//! Decode errors are structural: the document cannot be represented against
//! the schema at all, and the caller must not proceed with a partial result.
//! Content-level problems are the validator's territory and are never
//! reported from here in lenient mode.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unknown type: '{0}'")]
    UnknownType(String),

    #[error("More than one alternative of choice group '{field}' is populated at '{path}'")]
    AmbiguousChoice { path: String, field: String },

    #[error("Required field '{field}' is missing at '{path}'")]
    MissingRequiredField { path: String, field: String },

    #[error("Code '{code}' at '{path}' is not in required value set '{value_set}'")]
    UnboundCode {
        path: String,
        code: String,
        value_set: String,
    },

    #[error("Expected an object at '{path}'")]
    ExpectedObject { path: String },

    #[error("Expected an array for repeating field at '{path}'")]
    ExpectedArray { path: String },

    #[error("Unexpected array for singular field at '{path}'")]
    UnexpectedArray { path: String },

    #[error("Expected a '{expected}' primitive at '{path}'")]
    ExpectedPrimitive { path: String, expected: String },

    #[error("Contained resource at '{path}' has no resourceType")]
    MissingResourceType { path: String },

    #[error("XML error: {0}")]
    Format(#[from] argentum_format::FormatError),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Unknown type: '{0}'")]
    UnknownType(String),

    #[error("Choice group '{field}' on '{type_name}' has no selected alternative")]
    UntaggedChoice { type_name: String, field: String },

    #[error("Type '{type_code}' is not an alternative of choice group '{field}' on '{type_name}'")]
    UnknownAlternative {
        type_name: String,
        field: String,
        type_code: String,
    },

    #[error("XML error: {0}")]
    Format(#[from] argentum_format::FormatError),
}
