//! Taskmaster
//!
//! Per-user task search over a JSON task snapshot.
//!
//! # Usage
//!
//! ```bash
//! taskmaster build-index --token TOKEN
//! taskmaster search --token TOKEN report meeting
//! taskmaster search-term --token TOKEN report
//! taskmaster list --token TOKEN
//! taskmaster delete --token TOKEN TASK_ID
//! taskmaster shell --token TOKEN
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/taskmaster/config.toml)
//! 3. Environment variables (TASKMASTER_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use taskmaster_daemon::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
