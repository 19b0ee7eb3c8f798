//! Search error types.

use thiserror::Error;

use taskmaster_types::SourceError;

/// Errors that can occur during index operations.
///
/// A scope that was never built is not an error: it reads as empty and
/// triggers a build on the next search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The task source failed while (re)building a scope
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A scope lock was poisoned by a panicking writer
    #[error("Index lock poisoned for scope {scope}: {reason}")]
    LockPoisoned { scope: String, reason: String },
}

impl SearchError {
    pub(crate) fn poisoned(scope: &str, err: impl std::fmt::Display) -> Self {
        SearchError::LockPoisoned {
            scope: scope.to_string(),
            reason: err.to_string(),
        }
    }
}
