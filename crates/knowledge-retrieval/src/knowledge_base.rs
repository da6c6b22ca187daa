//! Knowledge base facade: ingest, search and listing over one store file.
//!
//! Ingests are serialized through an async lock held from reading the
//! current store until the new file has been renamed into place. Reads take
//! no lock; each loads its own snapshot and builds a fresh index.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use knowledge_embeddings::{DocumentEmbedder, EmbeddingProvider};
use knowledge_index::{SearchMatch, SimilarityIndex};
use knowledge_store::{
    validate_identifier, DocumentRecord, EmbeddingStore, StoreError, StoreStats,
};
use knowledge_types::{IngestMode, Settings};

use crate::error::RetrievalError;
use crate::report::{Document, IngestFailure, IngestReport};

/// Knowledge base configuration
#[derive(Debug, Clone)]
pub struct KnowledgeBaseConfig {
    /// Persisted store file
    pub store_path: PathBuf,
    /// Merge with or replace the persisted store on ingest
    pub ingest_mode: IngestMode,
}

impl KnowledgeBaseConfig {
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            ingest_mode: IngestMode::default(),
        }
    }

    pub fn with_ingest_mode(mut self, mode: IngestMode) -> Self {
        self.ingest_mode = mode;
        self
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            store_path: settings.expanded_store_path(),
            ingest_mode: settings.ingest_mode,
        }
    }
}

/// Embedding-based knowledge store.
pub struct KnowledgeBase<P: EmbeddingProvider> {
    embedder: DocumentEmbedder<P>,
    config: KnowledgeBaseConfig,
    write_lock: Mutex<()>,
}

impl<P: EmbeddingProvider> KnowledgeBase<P> {
    /// Create a new knowledge base.
    pub fn new(embedder: DocumentEmbedder<P>, config: KnowledgeBaseConfig) -> Self {
        Self {
            embedder,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.config.store_path
    }

    pub fn ingest_mode(&self) -> IngestMode {
        self.config.ingest_mode
    }

    /// Vector dimension of every stored record.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    pub fn embedder(&self) -> &DocumentEmbedder<P> {
        &self.embedder
    }

    /// Embed and persist a single document.
    ///
    /// Unlike `ingest_batch`, a provider failure is returned as an error.
    pub async fn ingest(&self, identifier: &str, raw_text: &str) -> Result<(), RetrievalError> {
        let record = self.embed_record(identifier, raw_text).await?;

        let _guard = self.write_lock.lock().await;
        let mut working = self.working_set()?;
        working.upsert(record)?;
        working.save(&self.config.store_path)?;

        info!(identifier = %identifier, records = working.len(), "Ingested document");
        Ok(())
    }

    /// Embed a batch of documents and persist them in one write.
    ///
    /// Documents that fail are reported and skipped. If none succeed the
    /// store is left untouched. Only store errors abort the batch.
    pub async fn ingest_batch(
        &self,
        documents: impl IntoIterator<Item = Document>,
    ) -> Result<IngestReport, RetrievalError> {
        let _guard = self.write_lock.lock().await;
        let mut working = self.working_set()?;
        let mut report = IngestReport::default();

        for document in documents {
            match self.embed_record(&document.identifier, &document.text).await {
                Ok(record) => {
                    let replaced = working.upsert(record)?;
                    debug!(
                        identifier = %document.identifier,
                        replaced = replaced,
                        "Embedded document"
                    );
                    report.stored.push(document.identifier);
                }
                Err(e) => {
                    warn!(identifier = %document.identifier, error = %e, "Failed to embed document");
                    report.failed.push(IngestFailure {
                        identifier: document.identifier,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.stored.is_empty() {
            if !report.failed.is_empty() {
                warn!(failed = report.failed.len(), "No documents embedded, store unchanged");
            }
            return Ok(report);
        }

        working.save(&self.config.store_path)?;
        report.persisted = true;
        report.total_records = working.len();

        info!(
            stored = report.stored.len(),
            failed = report.failed.len(),
            total = report.total_records,
            mode = self.config.ingest_mode.as_str(),
            "Batch ingest complete"
        );

        Ok(report)
    }

    /// Rank stored documents against free text.
    pub async fn search(
        &self,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<SearchMatch>, RetrievalError> {
        let query = self.embedder.embed_document(query_text).await?;
        self.search_vector(&query, k)
    }

    /// Rank stored documents against an already-computed vector.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchMatch>, RetrievalError> {
        let store = EmbeddingStore::load_or_empty(&self.config.store_path, self.dimension())?;
        let index = SimilarityIndex::build(&store);
        let matches = index.search(query, k)?;

        debug!(corpus = index.len(), k = k, found = matches.len(), "Search complete");
        Ok(matches)
    }

    /// Identifiers in persisted order. A missing store lists nothing.
    pub fn list_documents(&self) -> Result<Vec<String>, RetrievalError> {
        list_documents(&self.config.store_path, self.dimension())
    }

    /// Describe the persisted store.
    pub fn stats(&self) -> Result<StoreStats, RetrievalError> {
        store_stats(&self.config.store_path, self.dimension())
    }

    async fn embed_record(
        &self,
        identifier: &str,
        text: &str,
    ) -> Result<DocumentRecord, RetrievalError> {
        // reject before spending provider calls
        validate_identifier(identifier)?;
        let vector = self.embedder.embed_document(text).await?;
        Ok(DocumentRecord::new(identifier, vector)?)
    }

    /// Records a new ingest starts from, per the configured mode.
    fn working_set(&self) -> Result<EmbeddingStore, StoreError> {
        match self.config.ingest_mode {
            IngestMode::Merge => {
                EmbeddingStore::load_or_empty(&self.config.store_path, self.dimension())
            }
            IngestMode::Replace => Ok(EmbeddingStore::new(self.dimension())),
        }
    }
}

/// Identifiers stored at `store_path`, without an embedding provider.
pub fn list_documents(store_path: &Path, dimension: usize) -> Result<Vec<String>, RetrievalError> {
    let store = EmbeddingStore::load_or_empty(store_path, dimension)?;
    Ok(store.identifiers())
}

/// Stats of the store at `store_path`, without an embedding provider.
pub fn store_stats(store_path: &Path, dimension: usize) -> Result<StoreStats, RetrievalError> {
    Ok(EmbeddingStore::stats(store_path, dimension)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowledge_embeddings::{ChunkerConfig, MockProvider};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Maps known texts to fixed 2-d points; anything else is the origin.
    fn point_provider() -> MockProvider {
        MockProvider::with_fn(2, |text| match text {
            "alpha" => vec![0.0, 0.0],
            "beta" => vec![3.0, 0.0],
            "gamma" => vec![0.0, 4.0],
            "query" => vec![1.0, 0.0],
            _ => vec![0.0, 0.0],
        })
    }

    fn knowledge_base<P: EmbeddingProvider>(
        provider: P,
        temp: &TempDir,
        mode: IngestMode,
    ) -> KnowledgeBase<P> {
        let embedder = DocumentEmbedder::new(provider, ChunkerConfig::default()).unwrap();
        let config =
            KnowledgeBaseConfig::new(temp.path().join("embeddings.txt")).with_ingest_mode(mode);
        KnowledgeBase::new(embedder, config)
    }

    #[tokio::test]
    async fn test_search_scenario() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(point_provider(), &temp, IngestMode::Merge);

        let report = kb
            .ingest_batch(vec![
                Document::new("A", "alpha"),
                Document::new("B", "beta"),
                Document::new("C", "gamma"),
            ])
            .await
            .unwrap();
        assert_eq!(report.stored, vec!["A", "B", "C"]);
        assert!(report.persisted);

        let results = kb.search("query", 2).await.unwrap();
        assert_eq!(
            results,
            vec![SearchMatch::new("A", 1.0), SearchMatch::new("B", 4.0)]
        );
    }

    #[tokio::test]
    async fn test_partial_batch_failure_persists_successes() {
        let temp = TempDir::new().unwrap();
        let provider = MockProvider::new(4).failing_on("FAIL");
        let kb = knowledge_base(provider, &temp, IngestMode::Merge);

        let report = kb
            .ingest_batch(vec![
                Document::new("first.txt", "good content"),
                Document::new("second.txt", "this one will FAIL"),
            ])
            .await
            .unwrap();

        assert_eq!(report.stored, vec!["first.txt"]);
        assert_eq!(report.failed_identifiers(), vec!["second.txt"]);
        assert!(report.persisted);
        assert_eq!(kb.list_documents().unwrap(), vec!["first.txt"]);
    }

    #[tokio::test]
    async fn test_all_failed_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let provider = MockProvider::new(4).failing_on("FAIL");
        let kb = knowledge_base(provider, &temp, IngestMode::Merge);

        let report = kb
            .ingest_batch(vec![Document::new("x.txt", "FAIL"), Document::new("y.txt", "FAIL")])
            .await
            .unwrap();

        assert!(report.all_failed());
        assert!(!report.persisted);
        assert!(!kb.store_path().exists());
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(MockProvider::new(4), &temp, IngestMode::Merge);

        let report = kb.ingest_batch(Vec::new()).await.unwrap();
        assert!(!report.persisted);
        assert!(!report.all_failed());
    }

    #[tokio::test]
    async fn test_merge_mode_keeps_existing_records() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(MockProvider::new(4), &temp, IngestMode::Merge);

        kb.ingest_batch(vec![Document::new("a.txt", "one"), Document::new("b.txt", "two")])
            .await
            .unwrap();
        let report = kb
            .ingest_batch(vec![Document::new("c.txt", "three")])
            .await
            .unwrap();

        assert_eq!(report.total_records, 3);
        assert_eq!(kb.list_documents().unwrap(), vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn test_merge_mode_reingest_replaces_in_place() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(point_provider(), &temp, IngestMode::Merge);

        kb.ingest("A", "beta").await.unwrap();
        kb.ingest("B", "gamma").await.unwrap();
        kb.ingest("A", "alpha").await.unwrap();

        assert_eq!(kb.list_documents().unwrap(), vec!["A", "B"]);
        let results = kb.search("query", 1).await.unwrap();
        assert_eq!(results, vec![SearchMatch::new("A", 1.0)]);
    }

    #[tokio::test]
    async fn test_replace_mode_keeps_only_current_batch() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(MockProvider::new(4), &temp, IngestMode::Replace);

        kb.ingest_batch(vec![Document::new("a.txt", "one"), Document::new("b.txt", "two")])
            .await
            .unwrap();
        kb.ingest_batch(vec![Document::new("c.txt", "three")])
            .await
            .unwrap();

        assert_eq!(kb.list_documents().unwrap(), vec!["c.txt"]);
    }

    #[tokio::test]
    async fn test_ingest_propagates_provider_error() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(MockProvider::new(4).failing_on("FAIL"), &temp, IngestMode::Merge);

        let result = kb.ingest("bad.txt", "FAIL").await;
        assert!(matches!(result, Err(RetrievalError::Provider(_))));
        assert!(!kb.store_path().exists());
    }

    #[tokio::test]
    async fn test_invalid_identifier_skips_provider() {
        let temp = TempDir::new().unwrap();
        let provider = Arc::new(MockProvider::new(4));
        let kb = knowledge_base(provider.clone(), &temp, IngestMode::Merge);

        let report = kb
            .ingest_batch(vec![Document::new("tab\there", "text")])
            .await
            .unwrap();
        assert!(report.all_failed());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_search_missing_store_is_empty() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(point_provider(), &temp, IngestMode::Merge);

        assert!(kb.search("query", 5).await.unwrap().is_empty());
        assert!(kb.list_documents().unwrap().is_empty());
        assert!(!kb.stats().unwrap().exists);
    }

    #[tokio::test]
    async fn test_search_malformed_store_is_error() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(point_provider(), &temp, IngestMode::Merge);
        std::fs::write(kb.store_path(), "garbage without separator\n").unwrap();

        assert!(matches!(
            kb.search("query", 5).await,
            Err(RetrievalError::Store(_))
        ));
        assert!(matches!(kb.list_documents(), Err(RetrievalError::Store(_))));
    }

    #[tokio::test]
    async fn test_malformed_store_aborts_merge_ingest() {
        let temp = TempDir::new().unwrap();
        let provider = Arc::new(MockProvider::new(2));
        let kb = knowledge_base(provider.clone(), &temp, IngestMode::Merge);
        std::fs::write(kb.store_path(), "a\t[1.0]\n").unwrap();

        let result = kb.ingest_batch(vec![Document::new("b", "text")]).await;
        assert!(matches!(result, Err(RetrievalError::Store(_))));
        assert_eq!(provider.calls(), 0);
        // file left as it was
        assert_eq!(
            std::fs::read_to_string(kb.store_path()).unwrap(),
            "a\t[1.0]\n"
        );
    }

    #[tokio::test]
    async fn test_search_vector_dimension_mismatch() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(point_provider(), &temp, IngestMode::Merge);
        kb.ingest("A", "alpha").await.unwrap();

        assert!(matches!(
            kb.search_vector(&[1.0, 2.0, 3.0], 1),
            Err(RetrievalError::Index(_))
        ));
    }

    #[tokio::test]
    async fn test_search_k_larger_than_corpus() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(point_provider(), &temp, IngestMode::Merge);
        kb.ingest_batch(vec![Document::new("A", "alpha"), Document::new("B", "beta")])
            .await
            .unwrap();

        let results = kb.search("query", 10).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_provider_free_reads_match_knowledge_base() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(point_provider(), &temp, IngestMode::Merge);
        kb.ingest_batch(vec![Document::new("A", "alpha"), Document::new("B", "beta")])
            .await
            .unwrap();

        let path = temp.path().join("embeddings.txt");
        assert_eq!(list_documents(&path, 2).unwrap(), kb.list_documents().unwrap());
        assert_eq!(store_stats(&path, 2).unwrap().document_count, 2);

        let missing = temp.path().join("none.txt");
        assert!(list_documents(&missing, 2).unwrap().is_empty());
        assert!(!store_stats(&missing, 2).unwrap().exists);
    }

    #[tokio::test]
    async fn test_stats_after_ingest() {
        let temp = TempDir::new().unwrap();
        let kb = knowledge_base(MockProvider::new(8), &temp, IngestMode::Merge);
        kb.ingest("doc", "content").await.unwrap();

        let stats = kb.stats().unwrap();
        assert!(stats.exists);
        assert_eq!(stats.document_count, 1);
        assert_eq!(stats.dimension, 8);
    }
}
