//! Batch ingest outcome types.

use serde::{Deserialize, Serialize};

/// A document handed to batch ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Identifier stored with the vector (usually the file name)
    pub identifier: String,
    /// Raw document text
    pub text: String,
}

impl Document {
    pub fn new(identifier: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            text: text.into(),
        }
    }
}

/// A document that was skipped during batch ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestFailure {
    pub identifier: String,
    pub reason: String,
}

/// Outcome of one batch ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Identifiers embedded and persisted, in batch order
    pub stored: Vec<String>,
    /// Documents skipped, with the reason
    pub failed: Vec<IngestFailure>,
    /// Whether the store file was rewritten
    pub persisted: bool,
    /// Records in the store after the batch
    pub total_records: usize,
}

impl IngestReport {
    /// True when at least one document was requested and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.stored.is_empty() && !self.failed.is_empty()
    }

    pub fn failed_identifiers(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.identifier.as_str()).collect()
    }
}
