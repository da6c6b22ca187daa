//! # knowledge-retrieval
//!
//! Facade over the embedding pipeline, the flat-file store and the
//! similarity index.
//!
//! ## Operations
//!
//! - `ingest` / `ingest_batch`: embed documents and persist them
//! - `search` / `search_vector`: rank stored documents by squared L2 distance
//! - `list_documents`: identifiers in persisted order
//! - `stats`: size and count of the persisted store
//!
//! `list_documents` and `store_stats` are also free functions for callers
//! that have no embedding provider configured.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use knowledge_embeddings::{ChunkerConfig, DocumentEmbedder, MockProvider};
//! use knowledge_retrieval::{Document, KnowledgeBase, KnowledgeBaseConfig};
//!
//! let embedder = DocumentEmbedder::new(MockProvider::new(1024), ChunkerConfig::default())?;
//! let kb = KnowledgeBase::new(embedder, KnowledgeBaseConfig::new("embeddings.txt"));
//!
//! let report = kb.ingest_batch(vec![Document::new("notes.txt", text)]).await?;
//! let matches = kb.search("how do I grow an audience", 5).await?;
//! ```

pub mod error;
pub mod knowledge_base;
pub mod report;

pub use error::RetrievalError;
pub use knowledge_base::{list_documents, store_stats, KnowledgeBase, KnowledgeBaseConfig};
pub use report::{Document, IngestFailure, IngestReport};

// Re-exports so callers need only this crate for the common types
pub use knowledge_index::SearchMatch;
pub use knowledge_store::StoreStats;
