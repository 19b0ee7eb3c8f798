//! Task types.
//!
//! A [`TaskDocument`] is a task as the backing store holds it: every
//! descriptive field may be absent. A [`TaskRecord`] is the projection
//! handed to the search index and returned to callers, with every field
//! present. Both serialize with the field names the task store and the
//! web client already use.

use serde::{Deserialize, Serialize};

/// Title used when a task has none.
pub const DEFAULT_TITLE: &str = "Untitled";
/// Description used when a task has none.
pub const DEFAULT_DESCRIPTION: &str = "No description";
/// Importance label used when a task has none.
pub const DEFAULT_IMPORTANCE: &str = "Low";
/// Type label used when a task has none.
pub const DEFAULT_TASK_TYPE: &str = "General";
/// Due-date label used when a task has none.
pub const DEFAULT_DUE: &str = "No due date";

/// A task row as stored by the backing task collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDocument {
    /// Primary key of the task
    #[serde(rename = "_id")]
    pub task_id: String,

    /// Owner of the task
    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(rename = "TaskTitle", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "Task", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,

    #[serde(rename = "Due", default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
}

impl TaskDocument {
    /// Create a task document with no descriptive fields set.
    pub fn new(task_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            user_id: user_id.into(),
            title: None,
            description: None,
            importance: None,
            task_type: None,
            due: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_importance(mut self, importance: impl Into<String>) -> Self {
        self.importance = Some(importance.into());
        self
    }

    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    pub fn with_due(mut self, due: impl Into<String>) -> Self {
        self.due = Some(due.into());
        self
    }
}

/// Denormalized, immutable projection of a task.
///
/// Updates are modeled as remove + reinsert; a record is never edited in
/// place once it has been indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "id")]
    pub task_id: String,

    #[serde(rename = "TaskTitle")]
    pub title: String,

    #[serde(rename = "Task")]
    pub description: String,

    pub importance: String,

    #[serde(rename = "type")]
    pub task_type: String,

    #[serde(rename = "Due")]
    pub due: String,
}

impl From<&TaskDocument> for TaskRecord {
    fn from(doc: &TaskDocument) -> Self {
        fn or_default(value: &Option<String>, default: &str) -> String {
            value.clone().unwrap_or_else(|| default.to_string())
        }

        Self {
            task_id: doc.task_id.clone(),
            title: or_default(&doc.title, DEFAULT_TITLE),
            description: or_default(&doc.description, DEFAULT_DESCRIPTION),
            importance: or_default(&doc.importance, DEFAULT_IMPORTANCE),
            task_type: or_default(&doc.task_type, DEFAULT_TASK_TYPE),
            due: or_default(&doc.due, DEFAULT_DUE),
        }
    }
}

impl From<TaskDocument> for TaskRecord {
    fn from(doc: TaskDocument) -> Self {
        Self::from(&doc)
    }
}
