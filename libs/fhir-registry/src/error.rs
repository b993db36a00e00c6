//! Error types for registry construction and lookup

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Lookup miss. Fatal for the caller: there is no schema to decode or
    /// validate against.
    #[error("Unknown type: '{0}'")]
    UnknownType(String),

    #[error("Duplicate schema '{0}' in data tables")]
    DuplicateType(String),

    #[error("Duplicate value set '{0}' in data tables")]
    DuplicateValueSet(String),

    #[error("Schema table error: {0}")]
    Schema(#[from] argentum_schema::Error),

    #[error("Data table parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
