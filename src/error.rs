//! Error types for the Sigil library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`SigilError`] enum.
//!
//! # Examples
//!
//! ```
//! use sigil::error::{Result, SigilError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SigilError::query("Invalid query"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Sigil operations.
#[derive(Error, Debug)]
pub enum SigilError {
    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// Query-related errors (invalid queries, weight construction, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Resource exhausted
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SigilError.
pub type Result<T> = std::result::Result<T, SigilError>;

impl SigilError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        SigilError::Index(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        SigilError::Query(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        SigilError::InvalidOperation(msg.into())
    }

    /// Create a new resource exhausted error.
    pub fn resource_exhausted<S: Into<String>>(msg: S) -> Self {
        SigilError::ResourceExhausted(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SigilError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SigilError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = SigilError::index("Test index error");
        assert_eq!(error.to_string(), "Index error: Test index error");

        let error = SigilError::query("Test query error");
        assert_eq!(error.to_string(), "Query error: Test query error");

        let error = SigilError::resource_exhausted("too many tags");
        assert_eq!(error.to_string(), "Resource exhausted: too many tags");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let sigil_error = SigilError::from(io_error);

        match sigil_error {
            SigilError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
