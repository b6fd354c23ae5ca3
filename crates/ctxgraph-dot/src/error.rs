//! DOT interface error types

use thiserror::Error;

/// Result type alias for DOT operations
pub type DotResult<T> = std::result::Result<T, DotError>;

#[derive(Error, Debug)]
pub enum DotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed DOT input: {0}")]
    Parse(String),

    #[error("Malformed attribute {name}: {value}")]
    Attribute { name: String, value: String },
}
