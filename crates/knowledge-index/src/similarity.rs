//! Flat L2 index built from an embedding store snapshot.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;
use tracing::debug;

use knowledge_store::EmbeddingStore;

use crate::error::IndexError;

/// A single ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    /// Identifier of the matched document
    pub identifier: String,
    /// Squared Euclidean distance to the query (lower = closer)
    pub distance: f32,
}

impl SearchMatch {
    pub fn new(identifier: impl Into<String>, distance: f32) -> Self {
        Self {
            identifier: identifier.into(),
            distance,
        }
    }
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Heap entry ordered by (distance, position).
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    position: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.position.cmp(&other.position))
    }
}

/// Immutable exact-search index.
///
/// Safe to share across threads; nothing is mutated after `build`.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    dimension: usize,
    /// Row-major, `identifiers.len() * dimension` values
    matrix: Vec<f32>,
    identifiers: Vec<String>,
}

impl SimilarityIndex {
    /// Materialize the matrix from the store's current records.
    pub fn build(store: &EmbeddingStore) -> Self {
        let dimension = store.dimension();
        let mut matrix = Vec::with_capacity(store.len() * dimension);
        let mut identifiers = Vec::with_capacity(store.len());

        for record in store.records() {
            matrix.extend_from_slice(&record.vector);
            identifiers.push(record.identifier.clone());
        }

        debug!(rows = identifiers.len(), dim = dimension, "Built similarity index");

        Self {
            dimension,
            matrix,
            identifiers,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Identifier stored at `position` (insertion order).
    pub fn identifier(&self, position: usize) -> Option<&str> {
        self.identifiers.get(position).map(String::as_str)
    }

    fn row(&self, position: usize) -> &[f32] {
        let start = position * self.dimension;
        &self.matrix[start..start + self.dimension]
    }

    /// Return the `k` nearest records by squared L2 distance, ascending.
    ///
    /// `k` is clamped to the number of records; an empty index yields an
    /// empty result. Equal distances are ordered by insertion position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchMatch>, IndexError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        // max-heap holding the k best seen so far; the worst sits on top
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        for position in 0..self.len() {
            let candidate = Candidate {
                distance: squared_l2(query, self.row(position)),
                position,
            };

            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        let matches: Vec<SearchMatch> = heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| SearchMatch::new(self.identifiers[c.position].clone(), c.distance))
            .collect();

        debug!(k = k, found = matches.len(), "Search complete");
        Ok(matches)
    }
}
