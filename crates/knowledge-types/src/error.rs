//! Error types shared across the knowledge store.

use thiserror::Error;

/// Errors raised while assembling the runtime configuration.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for KnowledgeError {
    fn from(err: config::ConfigError) -> Self {
        KnowledgeError::Config(err.to_string())
    }
}
