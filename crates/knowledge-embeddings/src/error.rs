//! Embedding error types.

use thiserror::Error;

/// Errors that can occur while obtaining embeddings from a provider.
///
/// Every variant counts as a provider failure: the document being embedded
/// is abandoned as a whole.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Request never produced an HTTP response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("API request failed: {0}")]
    Api(String),

    /// Provider answered 429
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Response body could not be decoded
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// Response vector has the wrong length
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}
