//! Flat-file embedding store.
//!
//! Provides:
//! - Line-oriented load with fatal format errors (no silent truncation)
//! - Whole-file save via temp file + rename, so readers never see a partial write
//! - Append and last-write-wins upsert on the in-memory record list

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::record::DocumentRecord;

/// Ordered collection of document records sharing one vector dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingStore {
    dimension: usize,
    records: Vec<DocumentRecord>,
}

impl EmbeddingStore {
    /// Create an empty store.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: Vec::new(),
        }
    }

    /// Build a store from records, checking every vector's dimension.
    pub fn from_records(
        dimension: usize,
        records: impl IntoIterator<Item = DocumentRecord>,
    ) -> Result<Self, StoreError> {
        let mut store = Self::new(dimension);
        for record in records {
            store.push(record)?;
        }
        Ok(store)
    }

    /// Load a persisted store.
    ///
    /// A missing file is `StoreError::NotFound`; any malformed line aborts
    /// the load with `StoreError::Format`.
    pub fn load(path: impl AsRef<Path>, dimension: usize) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let store = Self::read_from(BufReader::new(file), dimension)?;
        debug!(path = ?path, records = store.len(), "Loaded embedding store");
        Ok(store)
    }

    /// Load a persisted store, treating a missing file as empty.
    pub fn load_or_empty(path: impl AsRef<Path>, dimension: usize) -> Result<Self, StoreError> {
        match Self::load(path.as_ref(), dimension) {
            Err(StoreError::NotFound(missing)) => {
                debug!(path = ?missing, "Store not created yet, using empty store");
                Ok(Self::new(dimension))
            }
            other => other,
        }
    }

    /// Parse records from any line-oriented reader.
    pub fn read_from(reader: impl BufRead, dimension: usize) -> Result<Self, StoreError> {
        let mut records = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|e| match e.kind() {
                ErrorKind::InvalidData => StoreError::Format {
                    line: line_no,
                    reason: "line is not valid UTF-8".to_string(),
                },
                _ => StoreError::Io(e),
            })?;
            records.push(DocumentRecord::parse_line(&line, line_no, dimension)?);
        }

        Ok(Self { dimension, records })
    }

    /// Persist every record to `path`, replacing whatever was there.
    ///
    /// Records are written to a temporary file in the same directory, synced,
    /// then renamed over the destination.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            for record in &self.records {
                writeln!(writer, "{}", record.to_line()?)?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

        info!(path = ?path, records = self.records.len(), "Saved embedding store");
        Ok(())
    }

    /// Append a record. Duplicate identifiers are kept.
    pub fn push(&mut self, record: DocumentRecord) -> Result<(), StoreError> {
        self.check_dimension(&record)?;
        self.records.push(record);
        Ok(())
    }

    /// Insert or replace by identifier (last write wins).
    ///
    /// An existing record keeps its position; any later duplicates of the
    /// same identifier are dropped. Returns true if a record was replaced.
    pub fn upsert(&mut self, record: DocumentRecord) -> Result<bool, StoreError> {
        self.check_dimension(&record)?;

        let Some(pos) = self
            .records
            .iter()
            .position(|r| r.identifier == record.identifier)
        else {
            self.records.push(record);
            return Ok(false);
        };

        self.records[pos] = record;
        let identifier = self.records[pos].identifier.clone();
        let mut idx = 0;
        self.records.retain(|r| {
            let keep = idx <= pos || r.identifier != identifier;
            idx += 1;
            keep
        });
        Ok(true)
    }

    fn check_dimension(&self, record: &DocumentRecord) -> Result<(), StoreError> {
        if record.dimension() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                identifier: record.identifier.clone(),
                expected: self.dimension,
                actual: record.dimension(),
            });
        }
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DocumentRecord> {
        self.records
    }

    /// Identifiers in stored order.
    pub fn identifiers(&self) -> Vec<String> {
        self.records.iter().map(|r| r.identifier.clone()).collect()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.records.iter().any(|r| r.identifier == identifier)
    }

    /// Describe the persisted store at `path`.
    ///
    /// Loads the file, so a malformed store is reported as an error.
    pub fn stats(path: impl AsRef<Path>, dimension: usize) -> Result<StoreStats, StoreError> {
        let path = path.as_ref();
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(StoreStats {
                    path: path.to_path_buf(),
                    exists: false,
                    document_count: 0,
                    dimension,
                    size_bytes: 0,
                    modified_at: None,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let store = Self::load(path, dimension)?;
        Ok(StoreStats {
            path: path.to_path_buf(),
            exists: true,
            document_count: store.len(),
            dimension,
            size_bytes: metadata.len(),
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

/// Summary of a persisted store
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Store file path
    pub path: PathBuf,
    /// Whether the file exists yet
    pub exists: bool,
    /// Number of records in the file
    pub document_count: usize,
    /// Vector dimension the store was read with
    pub dimension: usize,
    /// File size in bytes
    pub size_bytes: u64,
    /// Last modification time
    pub modified_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::TempDir;

    fn record(id: &str, vector: Vec<f32>) -> DocumentRecord {
        DocumentRecord::new(id, vector).unwrap()
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embeddings.txt");
        let mut rng = StdRng::seed_from_u64(7);

        let records: Vec<DocumentRecord> = (0..25)
            .map(|i| {
                let vector = (0..16).map(|_| rng.random_range(-10.0f32..10.0)).collect();
                record(&format!("doc-{i}.txt"), vector)
            })
            .collect();
        let store = EmbeddingStore::from_records(16, records).unwrap();
        store.save(&path).unwrap();

        let loaded = EmbeddingStore::load(&path, 16).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_round_trip_keeps_unicode_identifiers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embeddings.txt");
        let store = EmbeddingStore::from_records(
            2,
            vec![
                record("小红书运营.pdf", vec![1.0, 2.0]),
                record("notes with spaces.txt", vec![3.0, 4.0]),
            ],
        )
        .unwrap();
        store.save(&path).unwrap();

        let loaded = EmbeddingStore::load(&path, 2).unwrap();
        assert_eq!(
            loaded.identifiers(),
            vec!["小红书运营.pdf", "notes with spaces.txt"]
        );
    }

    #[test]
    fn test_save_replaces_prior_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embeddings.txt");

        EmbeddingStore::from_records(1, vec![record("a", vec![1.0]), record("b", vec![2.0])])
            .unwrap()
            .save(&path)
            .unwrap();
        EmbeddingStore::from_records(1, vec![record("c", vec![3.0])])
            .unwrap()
            .save(&path)
            .unwrap();

        let loaded = EmbeddingStore::load(&path, 1).unwrap();
        assert_eq!(loaded.identifiers(), vec!["c"]);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("kb").join("embeddings.txt");
        EmbeddingStore::new(3).save(&path).unwrap();
        assert!(path.exists());
        assert!(EmbeddingStore::load(&path, 3).unwrap().is_empty());
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embeddings.txt");
        EmbeddingStore::from_records(1, vec![record("a", vec![1.0])])
            .unwrap()
            .save(&path)
            .unwrap();

        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.txt");
        assert!(matches!(
            EmbeddingStore::load(&path, 4),
            Err(StoreError::NotFound(_))
        ));
        assert!(EmbeddingStore::load_or_empty(&path, 4).unwrap().is_empty());
    }

    #[test]
    fn test_load_malformed_line_is_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embeddings.txt");
        fs::write(&path, "a\t[1.0,2.0]\nbroken line\nc\t[5.0,6.0]\n").unwrap();

        match EmbeddingStore::load(&path, 2) {
            Err(StoreError::Format { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected Format error, got {:?}", other),
        }
        // a malformed file is an error even for the lenient loader
        assert!(EmbeddingStore::load_or_empty(&path, 2).is_err());
    }

    #[test]
    fn test_load_rejects_short_vector() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embeddings.txt");
        fs::write(&path, "a\t[1.0,2.0,3.0]\nb\t[1.0,2.0]\n").unwrap();
        assert!(matches!(
            EmbeddingStore::load(&path, 3),
            Err(StoreError::Format { line: 2, .. })
        ));
    }

    #[test]
    fn test_load_accepts_crlf() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embeddings.txt");
        fs::write(&path, "a\t[1.0]\r\nb\t[2.0]\r\n").unwrap();
        let loaded = EmbeddingStore::load(&path, 1).unwrap();
        assert_eq!(loaded.identifiers(), vec!["a", "b"]);
    }

    #[test]
    fn test_push_keeps_duplicates() {
        let mut store = EmbeddingStore::new(1);
        store.push(record("a", vec![1.0])).unwrap();
        store.push(record("a", vec![2.0])).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_push_rejects_wrong_dimension() {
        let mut store = EmbeddingStore::new(2);
        assert!(matches!(
            store.push(record("a", vec![1.0])),
            Err(StoreError::DimensionMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_upsert_last_write_wins_in_place() {
        let mut store = EmbeddingStore::from_records(
            1,
            vec![
                record("a", vec![1.0]),
                record("b", vec![2.0]),
                record("a", vec![3.0]),
                record("c", vec![4.0]),
            ],
        )
        .unwrap();

        let replaced = store.upsert(record("a", vec![9.0])).unwrap();
        assert!(replaced);
        assert_eq!(store.identifiers(), vec!["a", "b", "c"]);
        assert_eq!(store.records()[0].vector, vec![9.0]);

        let replaced = store.upsert(record("d", vec![5.0])).unwrap();
        assert!(!replaced);
        assert_eq!(store.identifiers(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_stats_missing_and_present() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embeddings.txt");

        let stats = EmbeddingStore::stats(&path, 2).unwrap();
        assert!(!stats.exists);
        assert_eq!(stats.document_count, 0);

        EmbeddingStore::from_records(2, vec![record("a", vec![1.0, 2.0])])
            .unwrap()
            .save(&path)
            .unwrap();
        let stats = EmbeddingStore::stats(&path, 2).unwrap();
        assert!(stats.exists);
        assert_eq!(stats.document_count, 1);
        assert!(stats.size_bytes > 0);
        assert!(stats.modified_at.is_some());
    }
}
