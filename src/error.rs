//! Error types for lesson-check
//!
//! This module defines the error types used throughout the library.
//! Problems inside executed fragments are not errors at this level: they
//! are recorded in the episode report. Only failures that stop a document
//! from being checked at all surface here.

use thiserror::Error;

/// Result type alias for lesson-check operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while checking a lesson
#[derive(Error, Debug)]
pub enum Error {
    /// Document structure breaks an ordering or fencing invariant
    #[error("format error: {0}")]
    Format(String),

    /// External document converter failed or produced unusable output
    #[error("converter error: {0}")]
    Converter(String),

    /// Python interpreter could not be started or stopped answering
    #[error("interpreter error: {0}")]
    Interpreter(String),

    /// Output capture could not be acquired
    #[error("capture error: {0}")]
    Capture(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether this error is a document format violation
    #[must_use]
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_display() {
        let err = Error::Format("Two output elements in a row.".to_string());
        assert_eq!(err.to_string(), "format error: Two output elements in a row.");
        assert!(err.is_format());
    }

    #[test]
    fn test_io_from() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("io error"));
        assert!(!err.is_format());
    }

    #[test]
    fn test_interpreter_display() {
        let err = Error::Interpreter("python3 exited unexpectedly".to_string());
        assert_eq!(err.to_string(), "interpreter error: python3 exited unexpectedly");
    }
}
