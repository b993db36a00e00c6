//! Error types for schema tables

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid schema '{name}': {reason}")]
    InvalidSchema { name: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
