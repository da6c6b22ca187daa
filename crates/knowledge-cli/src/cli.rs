//! CLI argument parsing for the knowledge store.
//!
//! Flags given here override every other configuration source.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Knowledge store
///
/// Embed text documents and search them by meaning.
#[derive(Parser, Debug)]
#[command(name = "knowledge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/knowledge-store/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the embedding store file
    #[arg(long, global = true)]
    pub store_path: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Store commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed documents and add them to the store
    Ingest {
        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Persist only this batch, discarding stored documents
        #[arg(long)]
        replace: bool,
    },

    /// Find the documents closest to a query
    Search {
        /// Query text
        query: String,

        /// Number of matches (default from config)
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// List stored document identifiers
    List,

    /// Show store statistics
    Stats,
}
