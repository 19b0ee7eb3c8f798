//! CLI argument parsing for the taskmaster binary.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

/// Taskmaster
///
/// Per-user task search over a JSON task snapshot.
#[derive(Parser, Debug)]
#[command(name = "taskmaster")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/taskmaster/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the task snapshot path
    #[arg(long, global = true)]
    pub tasks: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Rebuild the caller's search index
    BuildIndex {
        /// Bearer token
        #[arg(short, long)]
        token: String,
    },

    /// Search for tasks matching any of the terms
    Search {
        /// Bearer token
        #[arg(short, long)]
        token: String,

        /// Search terms
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Search for tasks matching a single term
    SearchTerm {
        /// Bearer token
        #[arg(short, long)]
        token: String,

        term: String,
    },

    /// List the caller's tasks
    List {
        /// Bearer token
        #[arg(short, long)]
        token: String,
    },

    /// Delete a task and save the snapshot
    Delete {
        /// Bearer token
        #[arg(short, long)]
        token: String,

        task_id: String,
    },

    /// Read commands from stdin against one long-lived index
    Shell {
        /// Bearer token
        #[arg(short, long)]
        token: String,
    },
}
