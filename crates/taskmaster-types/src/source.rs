//! Task source seam.
//!
//! The search index never reads the task store directly. It is handed a
//! [`TaskSource`] and asks it for one user's tasks when it (re)builds.

use thiserror::Error;

use crate::task::TaskDocument;

/// Failure reported by a task source.
///
/// The index passes these through to its caller untouched and never
/// retries.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backing store could not be reached
    #[error("Task source unavailable: {0}")]
    Unavailable(String),

    /// The backing store answered with an error
    #[error("Task source error: {0}")]
    Backend(String),
}

/// Read access to the task collection, already filtered to one user.
pub trait TaskSource: Send + Sync {
    /// Fetch every task owned by `user_id`, in store order.
    fn fetch_tasks_for_user(&self, user_id: &str) -> Result<Vec<TaskDocument>, SourceError>;
}

/// A plain list of documents acts as a source, filtering by owner.
impl TaskSource for Vec<TaskDocument> {
    fn fetch_tasks_for_user(&self, user_id: &str) -> Result<Vec<TaskDocument>, SourceError> {
        Ok(self
            .iter()
            .filter(|doc| doc.user_id == user_id)
            .cloned()
            .collect())
    }
}
