//! Retrieval error types.

use thiserror::Error;

use knowledge_embeddings::EmbeddingError;
use knowledge_index::IndexError;
use knowledge_store::StoreError;

/// Errors surfaced by the knowledge base facade.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Embedding provider failed or returned unusable data
    #[error("Embedding provider error: {0}")]
    Provider(#[from] EmbeddingError),

    /// Persisted store unreadable, unparsable or unwritable
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Query vector does not fit the index
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}
