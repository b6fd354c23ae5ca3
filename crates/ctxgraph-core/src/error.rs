//! Error types for Ctxgraph Core

use thiserror::Error;

/// Result type alias using Ctxgraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Ctxgraph error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("Empty graph: {0}")]
    EmptyGraph(String),
}
