//! End-to-end test infrastructure for taskmaster.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering the store -> index -> service path.

use std::path::PathBuf;
use std::sync::Arc;

use rand::Rng;

use taskmaster_search::IndexManager;
use taskmaster_service::{Claims, StaticTokenVerifier, TaskService, TokenRequest};
use taskmaster_storage::TaskStore;
use taskmaster_types::{IndexSettings, TaskDocument};

/// Words used to generate task text.
pub const VOCABULARY: &[&str] = &[
    "report", "meeting", "groceries", "invoice", "garden", "budget", "review", "travel",
    "dentist", "laundry", "deploy", "backup", "at", "to", "of",
];

/// Shared test harness for E2E tests.
///
/// Owns a temp dir for snapshots, a seeded task store, and a service
/// wired over them with one token per seeded user (`tok-<user>`).
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Where `save_snapshot` writes
    pub tasks_path: PathBuf,
    pub store: Arc<TaskStore>,
    pub index: Arc<IndexManager>,
    pub service: TaskService,
}

impl TestHarness {
    /// Harness seeded with the alice/bob fixture from [`scenario_tasks`].
    pub fn new() -> Self {
        Self::with_tasks(scenario_tasks(), IndexSettings::default())
    }

    pub fn with_tasks(tasks: Vec<TaskDocument>, settings: IndexSettings) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let tasks_path = temp_dir.path().join("tasks.json");

        let mut verifier = StaticTokenVerifier::new();
        for task in &tasks {
            verifier = verifier.with_token(token_for(&task.user_id), Claims::for_user(&task.user_id));
        }

        let store = Arc::new(TaskStore::from_documents(tasks).expect("Failed to seed task store"));
        let index = Arc::new(IndexManager::new(store.clone(), settings));
        let service = TaskService::new(store.clone(), index.clone(), Arc::new(verifier));

        Self {
            _temp_dir: temp_dir,
            tasks_path,
            store,
            index,
            service,
        }
    }

    pub fn token(&self, user_id: &str) -> TokenRequest {
        TokenRequest {
            token: token_for(user_id),
        }
    }

    pub fn save_snapshot(&self) {
        self.store
            .save(&self.tasks_path)
            .expect("Failed to save snapshot");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn token_for(user_id: &str) -> String {
    format!("tok-{}", user_id)
}

/// Two tasks for alice and one for bob that shares a word with alice's.
pub fn scenario_tasks() -> Vec<TaskDocument> {
    vec![
        TaskDocument::new("1", "alice")
            .with_title("Buy groceries")
            .with_description("Milk and eggs"),
        TaskDocument::new("2", "alice")
            .with_title("Finish report")
            .with_description("Quarterly numbers"),
        TaskDocument::new("3", "bob")
            .with_title("Report to the board")
            .with_description("Meet at noon"),
    ]
}

/// Create `count` tasks per user with random words from [`VOCABULARY`].
///
/// Ids are `<user>-<n>`, so they are unique across users.
pub fn create_random_tasks(users: &[&str], count: usize) -> Vec<TaskDocument> {
    let mut rng = rand::rng();
    let mut tasks = Vec::with_capacity(users.len() * count);
    for user in users {
        for n in 0..count {
            let title = random_text(&mut rng, 3);
            let description = random_text(&mut rng, 6);
            tasks.push(
                TaskDocument::new(format!("{}-{}", user, n), *user)
                    .with_title(title)
                    .with_description(description),
            );
        }
    }
    tasks
}

fn random_text(rng: &mut impl Rng, words: usize) -> String {
    (0..words)
        .map(|_| VOCABULARY[rng.random_range(0..VOCABULARY.len())])
        .collect::<Vec<_>>()
        .join(" ")
}
