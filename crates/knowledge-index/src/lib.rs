//! # knowledge-index
//!
//! Exact nearest-neighbor search over an embedding store snapshot.
//!
//! The index is a row-major matrix of every stored vector plus the owning
//! identifiers. It is built in one pass, never mutated afterwards, and
//! rebuilt from the store whenever a query needs current data.
//!
//! ## Features
//! - Squared Euclidean (L2) distance against every row
//! - Bounded max-heap top-k selection
//! - Deterministic ordering: ties go to the earlier inserted record

pub mod error;
pub mod similarity;

pub use error::IndexError;
pub use similarity::{squared_l2, SearchMatch, SimilarityIndex};
