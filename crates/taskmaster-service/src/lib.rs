//! Request handlers for the taskmaster backend.
//!
//! Provides:
//! - Index build, multi-term search and single-term search
//! - Task listing, deletion and editing, keeping the index in step
//! - Delete notifications for deletions made elsewhere
//! - The credential verifier seam that maps a token to a user id
//!
//! Handlers take and return plain serde types so any transport can sit in
//! front of them.

pub mod auth;
pub mod error;
pub mod service;
pub mod types;

pub use auth::{AuthError, Claims, CredentialVerifier, StaticTokenVerifier};
pub use error::{Code, ServiceError};
pub use service::TaskService;
pub use types::{
    BuildIndexResponse, DeleteTaskRequest, DeleteTaskResponse, SearchByTermQuery, SearchRequest,
    SearchResponse, TaskListResponse, TokenRequest, UpdateTaskRequest, UpdateTaskResponse,
};
