//! End-to-end test infrastructure for the knowledge store.
//!
//! Provides a shared TestHarness and deterministic providers for E2E tests
//! covering the full ingest-to-query pipeline.

use std::collections::HashMap;
use std::path::PathBuf;

use knowledge_embeddings::{ChunkerConfig, DocumentEmbedder, EmbeddingProvider, MockProvider};
use knowledge_retrieval::{Document, KnowledgeBase, KnowledgeBaseConfig};
use knowledge_types::IngestMode;

/// Dimension used by `keyword_provider`.
pub const KEYWORD_DIMENSION: usize = 64;

/// Shared test harness for E2E tests.
///
/// Owns a temp directory with the store file path used by every knowledge
/// base the harness creates.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Path of the persisted embedding file (not created up front)
    pub store_path: PathBuf,
}

impl TestHarness {
    /// Create a new test harness with a fresh temp directory.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let store_path = temp_dir.path().join("store").join("embeddings.txt");

        Self {
            _temp_dir: temp_dir,
            store_path,
        }
    }

    /// Knowledge base in merge mode over the harness store.
    pub fn knowledge_base<P: EmbeddingProvider>(&self, provider: P) -> KnowledgeBase<P> {
        self.knowledge_base_with(provider, IngestMode::Merge, ChunkerConfig::default())
    }

    pub fn knowledge_base_with<P: EmbeddingProvider>(
        &self,
        provider: P,
        mode: IngestMode,
        chunker: ChunkerConfig,
    ) -> KnowledgeBase<P> {
        let embedder = DocumentEmbedder::new(provider, chunker).expect("Invalid chunker config");
        KnowledgeBase::new(
            embedder,
            KnowledgeBaseConfig::new(&self.store_path).with_ingest_mode(mode),
        )
    }

    /// Raw contents of the store file.
    pub fn store_contents(&self) -> String {
        std::fs::read_to_string(&self.store_path).expect("Failed to read store file")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider mapping known texts to fixed vectors.
///
/// Unknown text maps to the origin.
pub fn point_provider(points: &[(&str, Vec<f32>)]) -> MockProvider {
    let dimension = points.first().map(|(_, v)| v.len()).unwrap_or(1);
    let table: HashMap<String, Vec<f32>> = points
        .iter()
        .map(|(text, v)| (text.to_string(), v.clone()))
        .collect();

    MockProvider::with_fn(dimension, move |segment| {
        table
            .get(segment)
            .cloned()
            .unwrap_or_else(|| vec![0.0; dimension])
    })
}

/// FNV-1a, stable across runs and platforms.
fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Bag-of-words provider: hashed word counts, scaled to unit length.
///
/// Texts sharing vocabulary land close together, which is enough to
/// exercise ranking without a real model.
pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; KEYWORD_DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
    {
        let slot = (fnv1a(&word.to_lowercase()) % KEYWORD_DIMENSION as u64) as usize;
        vector[slot] += 1.0;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

pub fn keyword_provider() -> MockProvider {
    MockProvider::with_fn(KEYWORD_DIMENSION, keyword_vector)
}

/// Three topic groups of five documents each, identified `<group>-<n>.txt`.
pub fn topic_corpus() -> Vec<Document> {
    let groups: [(&str, [&str; 5]); 3] = [
        (
            "rust",
            [
                "Rust ownership system ensures memory safety without garbage collection",
                "Borrowing rules in Rust prevent data races at compile time",
                "Lifetimes in Rust track how long references are valid",
                "The borrow checker enforces ownership and borrowing rules statically",
                "Move semantics in Rust transfer ownership of values between variables",
            ],
        ),
        (
            "pasta",
            [
                "Italian pasta recipes include classic carbonara and amatriciana",
                "Making fresh pasta dough requires flour eggs and olive oil",
                "Cooking al dente pasta means boiling until firm to the bite",
                "Traditional bolognese sauce simmers for hours with meat and tomatoes",
                "Homemade ravioli pasta are filled with ricotta cheese and spinach",
            ],
        ),
        (
            "neural",
            [
                "Neural networks learn patterns through layers of connected nodes",
                "Deep learning uses backpropagation to train neural network layers",
                "Convolutional neural networks excel at image recognition tasks",
                "Machine learning models generalize from training data to new inputs",
                "Gradient descent optimizes neural network weights during training",
            ],
        ),
    ];

    groups
        .iter()
        .flat_map(|(group, texts)| {
            texts
                .iter()
                .enumerate()
                .map(move |(i, text)| Document::new(format!("{group}-{i}.txt"), *text))
        })
        .collect()
}
