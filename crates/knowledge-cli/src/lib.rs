//! Knowledge CLI library exports.
//!
//! This crate provides the `knowledge` binary.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (ingest, search, list, stats)
//! - `documents`: Reading files and directories into documents

pub mod cli;
pub mod commands;
pub mod documents;

pub use cli::{Cli, Commands};
pub use commands::{
    handle_ingest, handle_list, handle_search, handle_stats, ingest_paths, init_logging,
    load_settings, open_knowledge_base, stored_identifiers, stored_stats,
};
