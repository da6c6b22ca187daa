//! Document chunking and centroid aggregation.
//!
//! A document of any length is cut into bounded character segments, each
//! segment is embedded independently, and the document vector is the
//! per-dimension mean of the segment vectors.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use knowledge_types::{Settings, MAX_SEGMENT_LENGTH};

use crate::error::EmbeddingError;
use crate::provider::{check_dimension, EmbeddingProvider};

/// Chunker configuration
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum characters per segment
    pub max_segment_length: usize,
    /// Maximum provider requests in flight for one document
    pub concurrency: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_segment_length: MAX_SEGMENT_LENGTH,
            concurrency: 4,
        }
    }
}

impl ChunkerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_segment_length: settings.max_segment_length,
            concurrency: settings.segment_concurrency,
        }
    }

    pub fn with_max_segment_length(mut self, max_segment_length: usize) -> Self {
        self.max_segment_length = max_segment_length;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Split `text` into contiguous segments of at most `max_len` characters.
///
/// Always returns at least one segment: empty input yields one empty
/// segment. Segments never split a UTF-8 code point, and concatenating them
/// reproduces `text` exactly. A `max_len` of zero is treated as one.
pub fn split_segments(text: &str, max_len: usize) -> Vec<&str> {
    let max_len = max_len.max(1);
    let mut segments = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_len {
            segments.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    segments.push(&text[start..]);

    segments
}

/// Per-dimension arithmetic mean of `vectors`.
///
/// Sums in f64 so long documents do not drift. Returns a zero vector when
/// `vectors` is empty.
pub fn mean_vector(vectors: &[Vec<f32>], dimension: usize) -> Vec<f32> {
    if vectors.is_empty() {
        return vec![0.0; dimension];
    }

    let mut sums = vec![0.0f64; dimension];
    for vector in vectors {
        for (sum, value) in sums.iter_mut().zip(vector.iter()) {
            *sum += f64::from(*value);
        }
    }

    let n = vectors.len() as f64;
    sums.into_iter().map(|s| (s / n) as f32).collect()
}

/// Turns whole documents into single vectors via a provider.
pub struct DocumentEmbedder<P: EmbeddingProvider> {
    provider: P,
    config: ChunkerConfig,
}

impl<P: EmbeddingProvider> DocumentEmbedder<P> {
    /// Create a new embedder.
    pub fn new(provider: P, config: ChunkerConfig) -> Result<Self, EmbeddingError> {
        if config.max_segment_length == 0 {
            return Err(EmbeddingError::Config(
                "max_segment_length must be > 0".to_string(),
            ));
        }
        if config.concurrency == 0 {
            return Err(EmbeddingError::Config("concurrency must be > 0".to_string()));
        }
        Ok(Self { provider, config })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Vector dimension produced by this embedder.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embed a whole document.
    ///
    /// Fails with the first provider error; no partial vector is produced.
    pub async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let segments = split_segments(text, self.config.max_segment_length);
        let dimension = self.provider.dimension();

        debug!(
            chars = text.chars().count(),
            segments = segments.len(),
            "Embedding document"
        );

        let vectors: Vec<Vec<f32>> = stream::iter(segments)
            .map(|segment| async move {
                let vector = self.provider.embed(segment).await?;
                check_dimension(&vector, dimension)?;
                Ok::<_, EmbeddingError>(vector)
            })
            .buffered(self.config.concurrency)
            .boxed()
            .try_collect()
            .await?;

        Ok(mean_vector(&vectors, dimension))
    }
}
