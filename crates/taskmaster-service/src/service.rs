//! Task service handlers.
//!
//! Every handler verifies the caller's token first and scopes all work to
//! the user id it yields. The index is built lazily by searches and kept in
//! step with deletes and edits made through this service.

use std::fmt::Display;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use taskmaster_search::{IndexManager, IndexStats};
use taskmaster_storage::TaskStore;
use taskmaster_types::{Settings, TaskRecord};

use crate::auth::{AuthError, CredentialVerifier, StaticTokenVerifier};
use crate::error::ServiceError;
use crate::types::{
    BuildIndexResponse, DeleteTaskRequest, DeleteTaskResponse, SearchByTermQuery, SearchRequest,
    SearchResponse, TaskListResponse, TokenRequest, UpdateTaskRequest, UpdateTaskResponse,
};

pub struct TaskService {
    store: Arc<TaskStore>,
    index: Arc<IndexManager>,
    verifier: Arc<dyn CredentialVerifier>,
    debug_mode: bool,
}

impl TaskService {
    pub fn new(
        store: Arc<TaskStore>,
        index: Arc<IndexManager>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            store,
            index,
            verifier,
            debug_mode: false,
        }
    }

    /// Wire a service from settings: the index reads from `store` and
    /// tokens are checked against `settings.auth`.
    pub fn from_settings(store: Arc<TaskStore>, settings: &Settings) -> Self {
        let index = IndexManager::new(store.clone(), settings.index.clone());
        let verifier = StaticTokenVerifier::from_user_ids(&settings.auth.tokens);
        Self::new(store, Arc::new(index), Arc::new(verifier)).with_debug_mode(settings.debug_mode)
    }

    /// Include internal error details in messages.
    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn index(&self) -> &Arc<IndexManager> {
        &self.index
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    async fn authenticate(&self, token: &str) -> Result<String, ServiceError> {
        let claims = self.verifier.verify(token).await.map_err(|e| match e {
            AuthError::Expired | AuthError::Invalid => ServiceError::Unauthenticated(e.to_string()),
        })?;

        claims
            .user_id()
            .map(str::to_string)
            .ok_or_else(|| ServiceError::InvalidArgument("Token does not contain user ID".to_string()))
    }

    fn internal(&self, context: &str, err: impl Display) -> ServiceError {
        error!(error = %err, "{}", context);
        if self.debug_mode {
            ServiceError::Internal(format!("{}: {}", context, err))
        } else {
            ServiceError::Internal(context.to_string())
        }
    }

    /// Rebuild the caller's index from the task store.
    pub async fn build_index(&self, request: TokenRequest) -> Result<BuildIndexResponse, ServiceError> {
        info!("BuildIndex request");
        let user_id = self.authenticate(&request.token).await?;

        let indexed_count = self
            .index
            .build_index(&user_id)
            .map_err(|e| self.internal("Failed to build index", e))?;
        let index_size = self
            .index
            .stats(&user_id)
            .map_err(|e| self.internal("Failed to read index stats", e))?
            .tokens;

        Ok(BuildIndexResponse {
            success: true,
            message: format!("Index built successfully with {} tasks", indexed_count),
            indexed_count,
            index_size,
        })
    }

    /// Search the caller's tasks for any of the given terms.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, ServiceError> {
        info!(terms = request.search_terms.len(), "Search request");
        let user_id = self.authenticate(&request.token).await?;

        let tasks = self
            .index
            .search(&user_id, request.search_terms.as_slice())
            .map_err(|e| self.internal("Search failed", e))?;

        let count = tasks.len();
        Ok(SearchResponse {
            success: true,
            tasks,
            count,
            message: format!("Found {} tasks matching your search", count),
        })
    }

    /// Search the caller's tasks for a single term.
    pub async fn search_by_term(
        &self,
        query: SearchByTermQuery,
    ) -> Result<SearchResponse, ServiceError> {
        info!(term = %query.term, "SearchByTerm request");
        let user_id = self.authenticate(&query.token).await?;

        let tasks = self
            .index
            .search_term(&user_id, &query.term)
            .map_err(|e| self.internal("Search failed", e))?;

        let count = tasks.len();
        Ok(SearchResponse {
            success: true,
            tasks,
            count,
            message: format!(
                "Found {} tasks matching '{}'",
                count,
                query.term.to_lowercase().trim()
            ),
        })
    }

    /// List the caller's tasks straight from the store.
    pub async fn list_tasks(&self, request: TokenRequest) -> Result<TaskListResponse, ServiceError> {
        info!("ListTasks request");
        let user_id = self.authenticate(&request.token).await?;

        let tasks: Vec<TaskRecord> = self
            .store
            .tasks_for_user(&user_id)
            .map_err(|e| self.internal("Failed to load tasks", e))?
            .iter()
            .map(TaskRecord::from)
            .collect();

        if tasks.is_empty() {
            return Ok(TaskListResponse {
                success: false,
                tasks,
                message: "No tasks found for this user".to_string(),
            });
        }

        Ok(TaskListResponse {
            success: true,
            tasks,
            message: "Tasks found successfully".to_string(),
        })
    }

    /// Delete one of the caller's tasks and drop it from their index.
    pub async fn delete_task(
        &self,
        request: DeleteTaskRequest,
    ) -> Result<DeleteTaskResponse, ServiceError> {
        info!(task_id = %request.task_id, "DeleteTask request");
        let user_id = self.authenticate(&request.token).await?;

        let task_id = request.task_id.trim();
        if task_id.is_empty() {
            return Err(ServiceError::InvalidArgument("Invalid task ID format".to_string()));
        }

        let owned = self
            .store
            .find_owned(task_id, &user_id)
            .map_err(|e| self.internal("Failed to look up task", e))?;
        if owned.is_none() {
            return Err(ServiceError::NotFound(
                "Task not found or not authorized to delete".to_string(),
            ));
        }

        let deleted = self
            .store
            .delete(task_id)
            .map_err(|e| self.internal("Failed to delete task", e))?;
        if !deleted {
            return Err(ServiceError::Internal("Failed to delete task".to_string()));
        }

        self.notify_deleted(&user_id, task_id);

        Ok(DeleteTaskResponse {
            success: true,
            message: "Task deleted successfully".to_string(),
        })
    }

    /// Edit one of the caller's tasks and refresh it in their index.
    pub async fn update_task(
        &self,
        request: UpdateTaskRequest,
    ) -> Result<UpdateTaskResponse, ServiceError> {
        info!(task_id = %request.task_id, "UpdateTask request");
        let user_id = self.authenticate(&request.token).await?;

        let mut doc = self
            .store
            .find_owned(&request.task_id, &user_id)
            .map_err(|e| self.internal("Failed to look up task", e))?
            .ok_or_else(|| {
                ServiceError::NotFound("Task not found or not authorized to edit".to_string())
            })?;

        if let Some(title) = request.title {
            doc.title = Some(title);
        }
        if let Some(description) = request.description {
            doc.description = Some(description);
        }
        if let Some(importance) = request.importance {
            doc.importance = Some(importance);
        }
        if let Some(task_type) = request.task_type {
            doc.task_type = Some(task_type);
        }
        if let Some(due) = request.due {
            doc.due = Some(due);
        }

        let record = TaskRecord::from(&doc);
        let updated = self
            .store
            .update(doc)
            .map_err(|e| self.internal("Failed to update task", e))?;
        if !updated {
            return Err(ServiceError::NotFound(
                "Task not found or not authorized to edit".to_string(),
            ));
        }

        let reindexed = match self.index.reindex_task(&user_id, record.clone()) {
            Ok(applied) => applied,
            Err(e) => {
                warn!(user_id = %user_id, task_id = %record.task_id, error = %e, "Failed to reindex edited task");
                false
            }
        };
        let reindexed = reindexed && self.settle_reindex(&user_id, &record.task_id);

        Ok(UpdateTaskResponse {
            success: true,
            message: "Task updated successfully".to_string(),
            task: record,
            reindexed,
        })
    }

    /// Size of the caller's index. Does not trigger a build.
    pub async fn stats(&self, request: TokenRequest) -> Result<IndexStats, ServiceError> {
        let user_id = self.authenticate(&request.token).await?;
        self.index
            .stats(&user_id)
            .map_err(|e| self.internal("Failed to read index stats", e))
    }

    /// Undo a reindex that raced a delete of the same task.
    ///
    /// A delete can remove the task from the store and the index between
    /// this service's store update and its reindex. Returns whether the task
    /// is still stored.
    fn settle_reindex(&self, user_id: &str, task_id: &str) -> bool {
        match self.store.find_owned(task_id, user_id) {
            Ok(Some(_)) => true,
            Ok(None) => {
                debug!(user_id, task_id, "Edited task deleted concurrently");
                self.notify_deleted(user_id, task_id);
                false
            }
            Err(e) => {
                warn!(user_id, task_id, error = %e, "Failed to confirm edited task");
                true
            }
        }
    }

    /// React to a task deleted from the store.
    ///
    /// Returns false only when the index could not be updated; a task that
    /// was never indexed is a success. Failures are logged and the delete
    /// that triggered the notification stands.
    pub fn notify_deleted(&self, user_id: &str, task_id: &str) -> bool {
        match self.index.remove_from_index(user_id, task_id) {
            Ok(removed) => {
                debug!(user_id, task_id, removed, "Index updated after delete");
                true
            }
            Err(e) => {
                warn!(user_id, task_id, error = %e, "Failed to update index after delete");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::error::Code;
    use taskmaster_types::{IndexSettings, TaskDocument};

    fn create_test_service() -> TaskService {
        let store = Arc::new(
            TaskStore::from_documents(vec![
                TaskDocument::new("1", "alice")
                    .with_title("Buy groceries")
                    .with_description("Milk and eggs"),
                TaskDocument::new("2", "alice")
                    .with_title("Finish report")
                    .with_description("Quarterly numbers"),
                TaskDocument::new("3", "bob").with_title("Report bug"),
            ])
            .unwrap(),
        );
        let index = Arc::new(IndexManager::new(store.clone(), IndexSettings::default()));
        let verifier = StaticTokenVerifier::new()
            .with_token("tok-alice", Claims::for_user("alice"))
            .with_token("tok-bob", Claims::for_user("bob"))
            .with_token("tok-carol", Claims::for_user("carol"))
            .with_token("tok-anon", Claims::default());
        TaskService::new(store, index, Arc::new(verifier))
    }

    fn token(t: &str) -> TokenRequest {
        TokenRequest {
            token: t.to_string(),
        }
    }

    fn search(t: &str, terms: &[&str]) -> SearchRequest {
        SearchRequest {
            token: t.to_string(),
            search_terms: terms.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_build_index() {
        let service = create_test_service();
        let response = service.build_index(token("tok-alice")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.indexed_count, 2);
        assert_eq!(response.index_size, 9);
        assert_eq!(response.message, "Index built successfully with 2 tasks");
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let service = create_test_service();
        let err = service.build_index(token("forged")).await.unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);
        assert_eq!(err.message(), "Invalid token");
    }

    #[tokio::test]
    async fn test_expired_token() {
        let store = Arc::new(TaskStore::new());
        let index = Arc::new(IndexManager::new(store.clone(), IndexSettings::default()));
        let verifier = StaticTokenVerifier::new().with_token(
            "tok-stale",
            Claims::for_user("alice").with_expiry(chrono::Utc::now() - chrono::Duration::minutes(5)),
        );
        let service = TaskService::new(store, index, Arc::new(verifier));

        let err = service.list_tasks(token("tok-stale")).await.unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);
        assert_eq!(err.message(), "Token has expired");
    }

    #[tokio::test]
    async fn test_token_without_user_id() {
        let service = create_test_service();
        let err = service.search(search("tok-anon", &["report"])).await.unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(err.message(), "Token does not contain user ID");
    }

    #[tokio::test]
    async fn test_search_scoped_to_caller() {
        let service = create_test_service();

        let response = service.search(search("tok-alice", &["report"])).await.unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.tasks[0].task_id, "2");
        assert_eq!(response.message, "Found 1 tasks matching your search");

        let response = service.search(search("tok-bob", &["report"])).await.unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.tasks[0].task_id, "3");
    }

    #[tokio::test]
    async fn test_search_by_term() {
        let service = create_test_service();
        let response = service
            .search_by_term(SearchByTermQuery {
                token: "tok-alice".to_string(),
                term: " Milk ".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.tasks[0].task_id, "1");
        assert_eq!(response.message, "Found 1 tasks matching 'milk'");
    }

    #[tokio::test]
    async fn test_list_tasks() {
        let service = create_test_service();
        let response = service.list_tasks(token("tok-alice")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.tasks.len(), 2);

        let response = service.list_tasks(token("tok-carol")).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.message, "No tasks found for this user");
    }

    #[tokio::test]
    async fn test_delete_task_updates_index() {
        let service = create_test_service();
        service.build_index(token("tok-alice")).await.unwrap();

        let response = service
            .delete_task(DeleteTaskRequest {
                token: "tok-alice".to_string(),
                task_id: "1".to_string(),
            })
            .await
            .unwrap();
        assert!(response.success);

        assert!(service.index().lookup("alice", "groceries").unwrap().is_empty());
        let response = service.search(search("tok-alice", &["milk", "report"])).await.unwrap();
        assert_eq!(response.count, 1);
        assert_eq!(response.tasks[0].task_id, "2");
        assert!(service.store().find_owned("1", "alice").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_other_users_task() {
        let service = create_test_service();
        let err = service
            .delete_task(DeleteTaskRequest {
                token: "tok-alice".to_string(),
                task_id: "3".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
        // Bob's task is untouched
        assert!(service.store().find_owned("3", "bob").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_empty_id() {
        let service = create_test_service();
        let err = service
            .delete_task(DeleteTaskRequest {
                token: "tok-alice".to_string(),
                task_id: "  ".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert_eq!(err.message(), "Invalid task ID format");
    }

    #[tokio::test]
    async fn test_notify_deleted_is_idempotent() {
        let service = create_test_service();
        service.build_index(token("tok-alice")).await.unwrap();

        assert!(service.notify_deleted("alice", "1"));
        assert!(service.notify_deleted("alice", "1"));
        assert!(service.notify_deleted("nobody", "1"));
    }

    #[tokio::test]
    async fn test_update_task_reindexes() {
        let service = create_test_service();
        service.build_index(token("tok-alice")).await.unwrap();

        let response = service
            .update_task(UpdateTaskRequest {
                token: "tok-alice".to_string(),
                task_id: "1".to_string(),
                title: Some("Buy flowers".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(response.reindexed);
        assert_eq!(response.task.title, "Buy flowers");
        // Untouched fields keep their stored values
        assert_eq!(response.task.description, "Milk and eggs");

        let found = service.search(search("tok-alice", &["flowers"])).await.unwrap();
        assert_eq!(found.count, 1);
        let stale = service.search(search("tok-alice", &["groceries"])).await.unwrap();
        assert_eq!(stale.count, 0);
    }

    #[tokio::test]
    async fn test_update_before_build_is_picked_up_by_lazy_build() {
        let service = create_test_service();

        let response = service
            .update_task(UpdateTaskRequest {
                token: "tok-alice".to_string(),
                task_id: "2".to_string(),
                description: Some("Annual figures".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!response.reindexed);

        let found = service.search(search("tok-alice", &["annual"])).await.unwrap();
        assert_eq!(found.count, 1);
    }

    #[tokio::test]
    async fn test_update_other_users_task() {
        let service = create_test_service();
        let err = service
            .update_task(UpdateTaskRequest {
                token: "tok-bob".to_string(),
                task_id: "1".to_string(),
                title: Some("Hijacked".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_reindex_after_concurrent_delete_is_undone() {
        let service = create_test_service();
        service.build_index(token("tok-alice")).await.unwrap();

        // An edit read task 1, then a delete removed it from the store and
        // the index before the edit's reindex ran.
        let stale = TaskRecord::from(
            &service.store().find_owned("1", "alice").unwrap().unwrap(),
        );
        service.store().delete("1").unwrap();
        assert!(service.notify_deleted("alice", "1"));
        assert!(service.index().reindex_task("alice", stale).unwrap());

        assert!(!service.settle_reindex("alice", "1"));
        assert!(service.index().lookup("alice", "groceries").unwrap().is_empty());
        let found = service.search(search("tok-alice", &["milk"])).await.unwrap();
        assert_eq!(found.count, 0);

        // A task that is still stored is left alone
        assert!(service.settle_reindex("alice", "2"));
        assert_eq!(service.index().lookup("alice", "report").unwrap(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_stats_does_not_build() {
        let service = create_test_service();
        let stats = service.stats(token("tok-alice")).await.unwrap();
        assert_eq!(stats.tokens, 0);
        assert!(stats.built_at.is_none());

        service.build_index(token("tok-alice")).await.unwrap();
        let stats = service.stats(token("tok-alice")).await.unwrap();
        assert_eq!(stats.records, 2);
        assert!(stats.built_at.is_some());
    }

    #[tokio::test]
    async fn test_from_settings() {
        let store = Arc::new(
            TaskStore::from_documents(vec![
                TaskDocument::new("1", "alice").with_title("Water plants")
            ])
            .unwrap(),
        );
        let mut settings = Settings::default();
        settings
            .auth
            .tokens
            .insert("tok-alice".to_string(), "alice".to_string());

        let service = TaskService::from_settings(store, &settings);
        let response = service.search(search("tok-alice", &["plants"])).await.unwrap();
        assert_eq!(response.count, 1);
    }
}
