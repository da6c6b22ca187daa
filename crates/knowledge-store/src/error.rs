//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur reading or writing the embedding file
#[derive(Error, Debug)]
pub enum StoreError {
    /// A persisted line could not be parsed; the whole load is abandoned
    #[error("Format error at line {line}: {reason}")]
    Format { line: usize, reason: String },

    /// The store file does not exist
    #[error("Store not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A record cannot be represented in the persisted format
    #[error("Invalid record {identifier:?}: {reason}")]
    InvalidRecord { identifier: String, reason: String },

    /// Record vector length differs from the store dimension
    #[error("Dimension mismatch for {identifier:?}: expected {expected}, got {actual}")]
    DimensionMismatch {
        identifier: String,
        expected: usize,
        actual: usize,
    },

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True for errors caused by malformed persisted content.
    pub fn is_format(&self) -> bool {
        matches!(self, StoreError::Format { .. })
    }
}
