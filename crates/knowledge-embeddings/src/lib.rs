//! # knowledge-embeddings
//!
//! Turns documents of any length into fixed-dimension vectors.
//!
//! ## Features
//! - `EmbeddingProvider` trait: the boundary to the embedding service
//! - `HttpEmbeddingProvider`: OpenAI-compatible `/embeddings` client
//! - `DocumentEmbedder`: character-bounded chunking with centroid aggregation
//! - `MockProvider`: deterministic provider for tests and offline use

pub mod chunker;
pub mod error;
pub mod http;
pub mod mock;
pub mod provider;

pub use chunker::{mean_vector, split_segments, ChunkerConfig, DocumentEmbedder};
pub use error::EmbeddingError;
pub use http::{HttpEmbeddingProvider, HttpProviderConfig};
pub use mock::MockProvider;
pub use provider::{check_dimension, EmbeddingProvider};
