//! Embedding store for the knowledge base.
//!
//! Persists document records as a flat text file:
//! - One record per line: identifier, tab, JSON array of numbers
//! - Insertion order is preserved and significant for tie-breaking
//! - Saves replace the whole file atomically (temp file + rename)
//! - Any malformed line fails the load; a missing file is distinguishable
//!   so read paths can treat it as an empty corpus

pub mod error;
pub mod record;
pub mod store;

pub use error::StoreError;
pub use record::{validate_identifier, DocumentRecord, FIELD_SEPARATOR};
pub use store::{EmbeddingStore, StoreStats};
