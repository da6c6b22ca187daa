//! Similarity index error types.

use thiserror::Error;

/// Errors that can occur during similarity search.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Query vector length differs from the indexed vectors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
