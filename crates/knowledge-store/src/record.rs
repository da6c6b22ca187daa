//! Document records and their line encoding.
//!
//! One record per line: the identifier, a tab, then the vector as a JSON
//! array of numbers.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Field separator between identifier and vector.
pub const FIELD_SEPARATOR: char = '\t';

/// A document identifier with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Source identifier, usually a file name
    pub identifier: String,
    /// Document-level embedding
    pub vector: Vec<f32>,
}

impl DocumentRecord {
    /// Create a record, rejecting anything the line format cannot hold.
    pub fn new(identifier: impl Into<String>, vector: Vec<f32>) -> Result<Self, StoreError> {
        let identifier = identifier.into();
        validate_identifier(&identifier)?;

        if let Some(pos) = vector.iter().position(|v| !v.is_finite()) {
            return Err(StoreError::InvalidRecord {
                identifier,
                reason: format!("non-finite value at component {}", pos),
            });
        }

        Ok(Self { identifier, vector })
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    /// Render as a persisted line (without the trailing newline).
    pub fn to_line(&self) -> Result<String, StoreError> {
        let vector =
            serde_json::to_string(&self.vector).map_err(|e| StoreError::InvalidRecord {
                identifier: self.identifier.clone(),
                reason: e.to_string(),
            })?;
        Ok(format!("{}{}{}", self.identifier, FIELD_SEPARATOR, vector))
    }

    /// Parse one persisted line. `line_no` is 1-based and only used in errors.
    pub fn parse_line(line: &str, line_no: usize, dimension: usize) -> Result<Self, StoreError> {
        let format_err = |reason: String| StoreError::Format {
            line: line_no,
            reason,
        };

        let (identifier, raw_vector) = line
            .split_once(FIELD_SEPARATOR)
            .ok_or_else(|| format_err("missing tab separator".to_string()))?;

        if identifier.is_empty() {
            return Err(format_err("empty identifier".to_string()));
        }

        let vector: Vec<f32> = serde_json::from_str(raw_vector)
            .map_err(|e| format_err(format!("invalid vector: {}", e)))?;

        if vector.len() != dimension {
            return Err(format_err(format!(
                "vector has {} components, expected {}",
                vector.len(),
                dimension
            )));
        }

        Ok(Self {
            identifier: identifier.to_string(),
            vector,
        })
    }
}

/// Identifiers must be non-empty and free of tabs and line breaks.
pub fn validate_identifier(identifier: &str) -> Result<(), StoreError> {
    let reason = if identifier.is_empty() {
        "identifier is empty"
    } else if identifier.contains(FIELD_SEPARATOR) {
        "identifier contains a tab"
    } else if identifier.contains(['\n', '\r']) {
        "identifier contains a line break"
    } else {
        return Ok(());
    };

    Err(StoreError::InvalidRecord {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    })
}
