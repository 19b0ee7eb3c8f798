//! Task collection for the taskmaster backend.
//!
//! Provides an in-process task store with:
//! - Insertion-ordered task documents, filtered per owner
//! - Ownership-checked lookup and delete
//! - JSON snapshot load/save
//! - A [`TaskSource`](taskmaster_types::TaskSource) implementation for the
//!   search index

pub mod error;
pub mod store;

pub use error::StorageError;
pub use store::TaskStore;
