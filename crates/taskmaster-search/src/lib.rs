//! # taskmaster-search
//!
//! In-memory inverted index over task titles and descriptions.
//!
//! Each user gets an independent index that is built from the task store on
//! demand, queried by exact word, and pruned when tasks are deleted.
//!
//! ## Features
//! - Per-user scopes, each behind its own lock
//! - Lazy build on the first search against an empty scope
//! - OR semantics across query terms, results in task order
//! - Idempotent removal for delete notifications
//!
//! Nothing is persisted; the index lives as long as the process.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use taskmaster_search::IndexManager;
//! use taskmaster_types::{IndexSettings, TaskDocument};
//!
//! let tasks = vec![TaskDocument::new("1", "alice").with_title("Finish report")];
//! let manager = IndexManager::new(Arc::new(tasks), IndexSettings::default());
//!
//! let results = manager.search("alice", &["report"]).unwrap();
//! assert_eq!(results[0].task_id, "1");
//! ```

pub mod error;
pub mod manager;
pub mod store;
pub mod tokenizer;

pub use error::SearchError;
pub use manager::IndexManager;
pub use store::{IndexStats, IndexStore, ScopeIndex};
pub use tokenizer::{normalize_word, Tokenizer};
