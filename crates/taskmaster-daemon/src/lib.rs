//! Taskmaster binary library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (one-shot requests and the shell)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{init_logging, load_settings, run, App, Reply};
