//! # taskmaster-types
//!
//! Shared domain types for the Taskmaster backend.
//!
//! This crate defines the data structures passed between the task store,
//! the search index and the request handlers:
//! - Task documents: raw task rows as held by the backing store
//! - Task records: immutable projections with defaults filled in
//! - Task source: the read seam the search index builds from
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use taskmaster_types::{TaskDocument, TaskRecord};
//!
//! let doc = TaskDocument::new("t-1", "user-1").with_title("Buy groceries");
//! let record = TaskRecord::from(&doc);
//! assert_eq!(record.description, "No description");
//! ```

pub mod config;
pub mod error;
pub mod source;
pub mod task;

pub use config::{AuthSettings, IndexSettings, QueryNormalization, Settings};
pub use error::TaskmasterError;
pub use source::{SourceError, TaskSource};
pub use task::{TaskDocument, TaskRecord};
