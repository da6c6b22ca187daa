//! # knowledge-types
//!
//! Shared constants and configuration for the knowledge store.
//!
//! Every other crate in the workspace depends on this one for:
//! - The default vector dimension and segment length
//! - `Settings`: layered configuration (file, env, CLI)
//! - `IngestMode`: merge-vs-replace policy for batch ingest
//!
//! ## Usage
//!
//! ```rust
//! use knowledge_types::{Settings, VECTOR_DIMENSION};
//!
//! let settings = Settings::default();
//! assert_eq!(settings.provider.dimension, VECTOR_DIMENSION);
//! ```

pub mod config;
pub mod error;

pub use config::{IngestMode, ProviderSettings, Settings};
pub use error::KnowledgeError;

/// Components in every stored vector unless configured otherwise.
pub const VECTOR_DIMENSION: usize = 1024;

/// Maximum characters per segment sent to the embedding provider.
pub const MAX_SEGMENT_LENGTH: usize = 512;

/// Matches returned by a search when the caller does not choose k.
pub const DEFAULT_TOP_K: usize = 5;
