//! Mock embedding provider for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::provider::EmbeddingProvider;

type VectorFn = dyn Fn(&str) -> Vec<f32> + Send + Sync;

/// Mock provider that generates deterministic vectors.
///
/// Useful for testing without making API calls. Segments containing the
/// configured failure marker fail with an API error.
pub struct MockProvider {
    dimension: usize,
    generator: Arc<VectorFn>,
    fail_marker: Option<String>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a mock whose vectors are derived from the segment's characters.
    pub fn new(dimension: usize) -> Self {
        Self::with_fn(dimension, move |segment| default_vector(segment, dimension))
    }

    /// Create a mock with a custom segment -> vector function.
    pub fn with_fn<F>(dimension: usize, generator: F) -> Self
    where
        F: Fn(&str) -> Vec<f32> + Send + Sync + 'static,
    {
        Self {
            dimension,
            generator: Arc::new(generator),
            fail_marker: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail every segment that contains `marker`.
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Number of embed calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Byte-sum based vector: stable across runs and sensitive to content.
fn default_vector(segment: &str, dimension: usize) -> Vec<f32> {
    let sum: u64 = segment.bytes().map(u64::from).sum();
    (0..dimension)
        .map(|i| ((sum + i as u64 * 31) % 101) as f32 / 100.0)
        .collect()
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, segment: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(marker) = &self.fail_marker {
            if segment.contains(marker.as_str()) {
                return Err(EmbeddingError::Api(format!(
                    "mock failure for segment containing {:?}",
                    marker
                )));
            }
        }

        Ok((self.generator)(segment))
    }
}
