//! Knowledge store CLI
//!
//! Embeds text documents through a remote embedding API and answers
//! nearest-neighbor queries over them.
//!
//! # Usage
//!
//! ```bash
//! knowledge ingest notes.txt docs/ [--replace]
//! knowledge search "how do I grow an audience" [-k 5]
//! knowledge list
//! knowledge stats [--json]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/knowledge-store/config.toml)
//! 3. Environment variables (KNOWLEDGE_*, e.g. KNOWLEDGE_PROVIDER__API_KEY)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use knowledge_cli::{
    handle_ingest, handle_list, handle_search, handle_stats, init_logging, load_settings, Cli,
    Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Ingest { paths, replace } => {
            handle_ingest(settings, paths, replace, cli.json).await?;
        }
        Commands::Search { query, k } => {
            handle_search(settings, &query, k, cli.json).await?;
        }
        Commands::List => {
            handle_list(&settings, cli.json)?;
        }
        Commands::Stats => {
            handle_stats(&settings, cli.json)?;
        }
    }

    Ok(())
}
