//! Command implementations for the knowledge CLI.
//!
//! Handles:
//! - ingest: read files, embed them, persist the store
//! - search: embed a query and rank stored documents
//! - list / stats: inspect the persisted store without the provider

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use knowledge_embeddings::{
    ChunkerConfig, DocumentEmbedder, EmbeddingProvider, HttpEmbeddingProvider, HttpProviderConfig,
};
use knowledge_retrieval::{
    list_documents, store_stats, IngestReport, KnowledgeBase, KnowledgeBaseConfig, SearchMatch,
    StoreStats,
};
use knowledge_types::{IngestMode, Settings};

use crate::cli::Cli;
use crate::documents::{collect_files, read_documents};

/// Load configuration and apply CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(store_path) = &cli.store_path {
        settings.store_path = store_path.clone();
    }
    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over config.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Build a knowledge base backed by the configured HTTP provider.
pub fn open_knowledge_base(settings: &Settings) -> Result<KnowledgeBase<HttpEmbeddingProvider>> {
    let provider_config = HttpProviderConfig::from_settings(&settings.provider)
        .context("Embedding provider is not configured")?;
    let provider =
        HttpEmbeddingProvider::new(provider_config).context("Failed to create HTTP client")?;
    let embedder = DocumentEmbedder::new(provider, ChunkerConfig::from_settings(settings))
        .context("Invalid chunker configuration")?;

    Ok(KnowledgeBase::new(
        embedder,
        KnowledgeBaseConfig::from_settings(settings),
    ))
}

/// Read `paths` (files or directories) and ingest them as one batch.
///
/// Unreadable files are reported alongside provider failures.
pub async fn ingest_paths<P: EmbeddingProvider>(
    kb: &KnowledgeBase<P>,
    paths: &[PathBuf],
) -> Result<IngestReport> {
    let files = collect_files(paths);
    let (documents, read_failures) = read_documents(&files);

    info!(
        files = files.len(),
        readable = documents.len(),
        store = %kb.store_path().display(),
        "Ingesting documents"
    );

    let mut report = kb
        .ingest_batch(documents)
        .await
        .context("Ingest aborted")?;
    report.failed.extend(read_failures);
    Ok(report)
}

/// `knowledge ingest`
pub async fn handle_ingest(
    mut settings: Settings,
    paths: Vec<PathBuf>,
    replace: bool,
    json: bool,
) -> Result<()> {
    if replace {
        settings.ingest_mode = IngestMode::Replace;
    }

    let kb = open_knowledge_base(&settings)?;
    let report = ingest_paths(&kb, &paths).await?;

    if json {
        print_json(&report)?;
    } else {
        print!("{}", format_report(&report));
    }

    if report.all_failed() {
        anyhow::bail!("No documents were ingested");
    }
    Ok(())
}

/// `knowledge search`
pub async fn handle_search(
    settings: Settings,
    query: &str,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    let k = k.unwrap_or(settings.default_top_k);
    let kb = open_knowledge_base(&settings)?;
    let matches = kb.search(query, k).await.context("Search failed")?;

    if json {
        print_json(&matches)?;
    } else {
        print!("{}", format_matches(&matches));
    }
    Ok(())
}

/// Identifiers in the configured store. Needs no provider credentials.
pub fn stored_identifiers(settings: &Settings) -> Result<Vec<String>> {
    let config = KnowledgeBaseConfig::from_settings(settings);
    list_documents(&config.store_path, settings.provider.dimension)
        .with_context(|| format!("Failed to read store {}", config.store_path.display()))
}

/// Stats of the configured store. Needs no provider credentials.
pub fn stored_stats(settings: &Settings) -> Result<StoreStats> {
    let config = KnowledgeBaseConfig::from_settings(settings);
    store_stats(&config.store_path, settings.provider.dimension)
        .with_context(|| format!("Failed to read store {}", config.store_path.display()))
}

/// `knowledge list`
pub fn handle_list(settings: &Settings, json: bool) -> Result<()> {
    let identifiers = stored_identifiers(settings)?;

    if json {
        print_json(&identifiers)?;
    } else if identifiers.is_empty() {
        println!("No documents stored");
    } else {
        for identifier in identifiers {
            println!("{identifier}");
        }
    }
    Ok(())
}

/// `knowledge stats`
pub fn handle_stats(settings: &Settings, json: bool) -> Result<()> {
    let stats = stored_stats(settings)?;

    if json {
        print_json(&stats)?;
    } else {
        print!("{}", format_stats(&stats));
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One line per document, then a summary.
pub fn format_report(report: &IngestReport) -> String {
    let mut out = String::new();
    for identifier in &report.stored {
        out.push_str(&format!("stored  {identifier}\n"));
    }
    for failure in &report.failed {
        out.push_str(&format!(
            "failed  {}: {}\n",
            failure.identifier, failure.reason
        ));
    }
    if report.persisted {
        out.push_str(&format!(
            "{} stored, {} failed, {} documents in store\n",
            report.stored.len(),
            report.failed.len(),
            report.total_records
        ));
    } else {
        out.push_str(&format!(
            "{} failed, store unchanged\n",
            report.failed.len()
        ));
    }
    out
}

pub fn format_matches(matches: &[SearchMatch]) -> String {
    if matches.is_empty() {
        return "No matches\n".to_string();
    }
    matches
        .iter()
        .enumerate()
        .map(|(rank, m)| format!("{:>3}. {:<40} {:.4}\n", rank + 1, m.identifier, m.distance))
        .collect()
}

pub fn format_stats(stats: &StoreStats) -> String {
    let mut out = format!("Store:      {}\n", stats.path.display());
    if !stats.exists {
        out.push_str("Status:     not created yet\n");
        return out;
    }
    out.push_str(&format!("Documents:  {}\n", stats.document_count));
    out.push_str(&format!("Dimension:  {}\n", stats.dimension));
    out.push_str(&format!("Size:       {} bytes\n", stats.size_bytes));
    if let Some(modified) = stats.modified_at {
        out.push_str(&format!("Modified:   {}\n", modified.to_rfc3339()));
    }
    out
}
