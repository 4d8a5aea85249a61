//! Command-line interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rag-server", version, about = "RAG service over a local repository")]
pub struct Cli {
    /// Path to mcp-config.json (overrides discovery and MCP_CONFIG_FILE).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Index documentation and code into the configured collections.
    Index(IndexArgs),
    /// Print point counts per collection, split by deletion state.
    Stats,
    /// Clear the is_deleted flag on soft-deleted chunks.
    Recover(RecoverArgs),
    /// Physically purge soft-deleted chunks (preview by default).
    Delete(DeleteArgs),
    /// Remove local caches (model weights); collections are untouched.
    Clean,
    /// Serve the MCP control channel on stdio.
    Start,
    /// Validate the configuration and prepare collections and indexes.
    Setup,
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Index documentation globs only.
    #[arg(long, conflicts_with = "code")]
    pub docs: bool,
    /// Index code globs only.
    #[arg(long)]
    pub code: bool,
    /// Restrict to the cloud collection.
    #[arg(long, conflicts_with = "local")]
    pub cloud: bool,
    /// Restrict to the local collection.
    #[arg(long)]
    pub local: bool,
    /// After indexing, sweep chunks whose files left the live set.
    #[arg(long)]
    pub cleanup: bool,
    /// Report the sweep without applying it (the default).
    #[arg(long, conflicts_with = "prune")]
    pub dry_run: bool,
    /// Apply the sweep: soft-delete orphaned chunks.
    #[arg(long)]
    pub prune: bool,
}

#[derive(Debug, Args)]
pub struct RecoverArgs {
    /// Recover every soft-deleted chunk.
    #[arg(long, conflicts_with = "file")]
    pub all: bool,
    /// Recover the chunks of one file (project-relative path).
    #[arg(long)]
    pub file: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Show what would be purged (the default).
    #[arg(long, conflicts_with = "confirm")]
    pub preview: bool,
    /// Apply the purge; this is irreversible.
    #[arg(long)]
    pub confirm: bool,
}
