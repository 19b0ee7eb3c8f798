//! In-process task store.
//!
//! Tasks are kept in insertion order behind a single `RwLock`. The store
//! can be seeded from and saved to a JSON array of task documents.

use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use taskmaster_types::{SourceError, TaskDocument, TaskSource};

use crate::error::StorageError;

/// Main storage interface for task documents
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<Vec<TaskDocument>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from documents, rejecting duplicate ids.
    pub fn from_documents(docs: Vec<TaskDocument>) -> Result<Self, StorageError> {
        let store = Self::new();
        for doc in docs {
            store.insert(doc)?;
        }
        Ok(store)
    }

    /// Load a JSON snapshot. A missing file opens an empty store.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            info!(path = ?path, "No task snapshot, starting empty");
            return Ok(Self::new());
        }

        let bytes = fs::read(path)?;
        let docs: Vec<TaskDocument> = serde_json::from_slice(&bytes)?;
        let tasks = docs.len();
        let store = Self::from_documents(docs)?;
        info!(path = ?path, tasks, "Loaded task snapshot");
        Ok(store)
    }

    /// Write all tasks to a JSON snapshot, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&*self.read()?)?;
        fs::write(path, json)?;
        debug!(path = ?path, "Saved task snapshot");
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<TaskDocument>>, StorageError> {
        self.tasks
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<TaskDocument>>, StorageError> {
        self.tasks
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    /// Add a task. Ids are unique across all users.
    pub fn insert(&self, doc: TaskDocument) -> Result<(), StorageError> {
        let mut tasks = self.write()?;
        if tasks.iter().any(|t| t.task_id == doc.task_id) {
            return Err(StorageError::DuplicateId(doc.task_id));
        }
        debug!(task_id = %doc.task_id, user_id = %doc.user_id, "Stored task");
        tasks.push(doc);
        Ok(())
    }

    /// All tasks owned by `user_id`, in insertion order.
    pub fn tasks_for_user(&self, user_id: &str) -> Result<Vec<TaskDocument>, StorageError> {
        Ok(self
            .read()?
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    /// A task, only if `user_id` owns it.
    pub fn find_owned(
        &self,
        task_id: &str,
        user_id: &str,
    ) -> Result<Option<TaskDocument>, StorageError> {
        Ok(self
            .read()?
            .iter()
            .find(|t| t.task_id == task_id && t.user_id == user_id)
            .cloned())
    }

    /// Delete a task. Returns false when no task had that id.
    pub fn delete(&self, task_id: &str) -> Result<bool, StorageError> {
        let mut tasks = self.write()?;
        let before = tasks.len();
        tasks.retain(|t| t.task_id != task_id);
        let deleted = tasks.len() < before;
        debug!(task_id, deleted, "Delete task");
        Ok(deleted)
    }

    /// Replace a stored task with the same id. Returns false when absent.
    pub fn update(&self, doc: TaskDocument) -> Result<bool, StorageError> {
        let mut tasks = self.write()?;
        match tasks.iter_mut().find(|t| t.task_id == doc.task_id) {
            Some(slot) => {
                *slot = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.read()?.is_empty())
    }
}

impl TaskSource for TaskStore {
    fn fetch_tasks_for_user(&self, user_id: &str) -> Result<Vec<TaskDocument>, SourceError> {
        self.tasks_for_user(user_id)
            .map_err(|e| SourceError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_store() -> TaskStore {
        TaskStore::from_documents(vec![
            TaskDocument::new("1", "alice").with_title("Buy groceries"),
            TaskDocument::new("2", "bob").with_title("Fix bike"),
            TaskDocument::new("3", "alice").with_title("Finish report"),
        ])
        .unwrap()
    }

    #[test]
    fn test_tasks_for_user_in_order() {
        let store = sample_store();
        let ids: Vec<String> = store
            .tasks_for_user("alice")
            .unwrap()
            .into_iter()
            .map(|t| t.task_id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(store.tasks_for_user("carol").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = sample_store();
        let err = store.insert(TaskDocument::new("2", "alice")).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateId(id) if id == "2"));
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_find_owned_checks_owner() {
        let store = sample_store();
        assert!(store.find_owned("1", "alice").unwrap().is_some());
        assert!(store.find_owned("1", "bob").unwrap().is_none());
        assert!(store.find_owned("9", "alice").unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let store = sample_store();
        assert!(store.delete("1").unwrap());
        assert!(!store.delete("1").unwrap());
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_update() {
        let store = sample_store();
        let edited = TaskDocument::new("3", "alice").with_title("Finish slides");
        assert!(store.update(edited).unwrap());

        let doc = store.find_owned("3", "alice").unwrap().unwrap();
        assert_eq!(doc.title.as_deref(), Some("Finish slides"));

        assert!(!store.update(TaskDocument::new("9", "alice")).unwrap());
    }

    #[test]
    fn test_save_and_open_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("tasks.json");

        let store = sample_store();
        store.delete("2").unwrap();
        store.save(&path).unwrap();

        let reopened = TaskStore::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 2);
        assert!(reopened.find_owned("3", "alice").unwrap().is_some());
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = TaskStore::open(&temp_dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_open_reads_wire_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"[{"_id":"a1","userId":"alice","TaskTitle":"Call mom","Task":"Sunday"}]"#,
        )
        .unwrap();

        let store = TaskStore::open(&path).unwrap();
        let doc = store.find_owned("a1", "alice").unwrap().unwrap();
        assert_eq!(doc.description.as_deref(), Some("Sunday"));
    }

    #[test]
    fn test_open_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = TaskStore::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_poisoned_lock_reported_by_every_accessor() {
        let store = std::sync::Arc::new(sample_store());

        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.tasks.write().unwrap();
            panic!("writer failed mid-update");
        })
        .join();

        assert!(matches!(store.len(), Err(StorageError::LockPoisoned(_))));
        assert!(matches!(store.is_empty(), Err(StorageError::LockPoisoned(_))));
        assert!(matches!(
            store.tasks_for_user("alice"),
            Err(StorageError::LockPoisoned(_))
        ));
        assert!(matches!(
            store.fetch_tasks_for_user("alice"),
            Err(SourceError::Backend(_))
        ));
    }

    #[test]
    fn test_task_source_impl() {
        let store = sample_store();
        let docs = store.fetch_tasks_for_user("bob").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].task_id, "2");
    }
}
