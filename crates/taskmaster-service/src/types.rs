//! Request and response bodies.
//!
//! Field names follow the JSON the web client already sends and reads.

use serde::{Deserialize, Serialize};

use taskmaster_types::TaskRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub token: String,
    pub search_terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchByTermQuery {
    pub token: String,
    pub term: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTaskRequest {
    pub token: String,
    pub task_id: String,
}

/// Edit of an existing task. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub token: String,
    pub task_id: String,
    #[serde(rename = "TaskTitle", default)]
    pub title: Option<String>,
    #[serde(rename = "Task", default)]
    pub description: Option<String>,
    #[serde(default)]
    pub importance: Option<String>,
    #[serde(rename = "type", default)]
    pub task_type: Option<String>,
    #[serde(rename = "Due", default)]
    pub due: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildIndexResponse {
    pub success: bool,
    pub message: String,
    /// Tasks indexed
    pub indexed_count: usize,
    /// Distinct tokens in the index
    pub index_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub tasks: Vec<TaskRecord>,
    pub count: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub success: bool,
    pub tasks: Vec<TaskRecord>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTaskResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskResponse {
    pub success: bool,
    pub message: String,
    pub task: TaskRecord,
    /// Whether a built index was updated in place
    pub reindexed: bool,
}
