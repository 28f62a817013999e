//! Shared base error kinds.
//!
//! Downstream crates wrap this via `#[from]`, the same layering the teacher
//! uses between its `serve::Error` and `adapt::Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("page not found: {0}")]
    NotFound(String),

    #[error("page already exists: {0}")]
    AlreadyExists(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("storage error: {0}")]
    StorageError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
