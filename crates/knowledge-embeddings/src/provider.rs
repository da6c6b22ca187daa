//! Embedding provider trait.
//!
//! Defines the boundary to whatever service turns a text segment into a
//! fixed-length vector.

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Pluggable embedding provider.
///
/// Implementations must be thread-safe (Send + Sync) so segments of one
/// document can be requested concurrently.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Embed a single segment.
    async fn embed(&self, segment: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for std::sync::Arc<P> {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    async fn embed(&self, segment: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(segment).await
    }
}

/// Check a provider response against the expected dimension.
pub fn check_dimension(vector: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimension_ok() {
        assert!(check_dimension(&[0.0, 1.0, 2.0], 3).is_ok());
    }

    #[test]
    fn test_check_dimension_mismatch() {
        match check_dimension(&[0.0, 1.0], 3) {
            Err(EmbeddingError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected DimensionMismatch, got {:?}", other),
        }
    }
}
