//! Command implementations for the taskmaster binary.
//!
//! Handles:
//! - one-shot requests: build-index, search, search-term, list, delete
//! - shell: many requests against one in-memory index

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use taskmaster_service::{
    DeleteTaskRequest, SearchByTermQuery, SearchRequest, ServiceError, TaskService, TokenRequest,
};
use taskmaster_storage::TaskStore;
use taskmaster_types::Settings;

use crate::cli::{Cli, Commands};

/// Load configuration and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    tasks_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    if let Some(tasks) = tasks_override {
        settings.tasks_path = tasks.to_string();
    }

    Ok(settings)
}

/// Install the global tracing subscriber. Logs go to stderr so stdout
/// carries only responses.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Rendered response body and whether the request succeeded.
#[derive(Debug, Clone)]
pub struct Reply {
    pub body: String,
    pub ok: bool,
    /// A failure after the request itself was served, such as saving the
    /// snapshot after a delete.
    pub follow_up_error: Option<String>,
}

fn render<T: Serialize>(result: Result<T, ServiceError>) -> Result<Reply> {
    let (value, ok) = match result {
        Ok(response) => (serde_json::to_value(response)?, true),
        Err(e) => (
            json!({
                "success": false,
                "status": e.code().http_status(),
                "message": e.message(),
            }),
            false,
        ),
    };
    Ok(Reply {
        body: serde_json::to_string_pretty(&value)?,
        ok,
        follow_up_error: None,
    })
}

fn usage(message: &str) -> Result<Reply> {
    render::<()>(Err(ServiceError::InvalidArgument(message.to_string())))
}

/// A task service over the snapshot named in settings.
pub struct App {
    service: TaskService,
    tasks_path: PathBuf,
}

impl App {
    pub fn open(settings: &Settings) -> Result<Self> {
        let tasks_path = settings.expanded_tasks_path();
        info!("Opening task snapshot at {:?}", tasks_path);

        let store = TaskStore::open(&tasks_path).context("Failed to open task snapshot")?;
        let service = TaskService::from_settings(Arc::new(store), settings);

        Ok(Self {
            service,
            tasks_path,
        })
    }

    pub fn service(&self) -> &TaskService {
        &self.service
    }

    /// Run a one-shot command.
    pub async fn execute(&self, command: Commands) -> Result<Reply> {
        match command {
            Commands::BuildIndex { token } => {
                render(self.service.build_index(TokenRequest { token }).await)
            }
            Commands::Search { token, terms } => render(
                self.service
                    .search(SearchRequest {
                        token,
                        search_terms: terms,
                    })
                    .await,
            ),
            Commands::SearchTerm { token, term } => render(
                self.service
                    .search_by_term(SearchByTermQuery { token, term })
                    .await,
            ),
            Commands::List { token } => render(self.service.list_tasks(TokenRequest { token }).await),
            Commands::Delete { token, task_id } => self.delete(token, task_id).await,
            Commands::Shell { .. } => anyhow::bail!("The shell reads commands from stdin"),
        }
    }

    async fn delete(&self, token: String, task_id: String) -> Result<Reply> {
        let result = self
            .service
            .delete_task(DeleteTaskRequest { token, task_id })
            .await;
        let saved = match &result {
            Ok(_) => self.service.store().save(&self.tasks_path).err(),
            Err(_) => None,
        };

        let mut reply = render(result)?;
        if let Some(e) = saved {
            warn!(path = ?self.tasks_path, error = %e, "Task deleted but snapshot not saved");
            reply.follow_up_error = Some(format!("Failed to save task snapshot: {}", e));
        }
        Ok(reply)
    }

    /// Serve one shell line. Returns `None` when the shell should exit.
    async fn shell_line(&self, token: &str, line: &str) -> Result<Option<Reply>> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Some(usage("Empty command")?));
        };
        let args: Vec<String> = words.map(str::to_string).collect();
        let token = token.to_string();

        let reply = match command {
            "quit" | "exit" => return Ok(None),
            "build" => render(self.service.build_index(TokenRequest { token }).await)?,
            "search" if args.is_empty() => usage("Usage: search <terms...>")?,
            "search" => render(
                self.service
                    .search(SearchRequest {
                        token,
                        search_terms: args,
                    })
                    .await,
            )?,
            "term" => match args.first() {
                Some(term) => render(
                    self.service
                        .search_by_term(SearchByTermQuery {
                            token,
                            term: term.clone(),
                        })
                        .await,
                )?,
                None => usage("Usage: term <term>")?,
            },
            "list" => render(self.service.list_tasks(TokenRequest { token }).await)?,
            "delete" => match args.first() {
                Some(task_id) => self.delete(token, task_id.clone()).await?,
                None => usage("Usage: delete <task-id>")?,
            },
            "stats" => render(self.service.stats(TokenRequest { token }).await)?,
            other => usage(&format!("Unknown command: {}", other))?,
        };
        Ok(Some(reply))
    }

    /// Read commands line by line until `quit` or end of input.
    pub async fn run_shell<R, W>(&self, token: &str, reader: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!(line = %line, "Shell command");
            match self.shell_line(token, &line).await? {
                Some(reply) => {
                    if !reply.ok {
                        warn!(line = %line, "Shell command failed");
                    }
                    writeln!(out, "{}", reply.body)?;
                    out.flush()?;
                    if let Some(e) = reply.follow_up_error {
                        eprintln!("{}", e);
                    }
                }
                None => break,
            }
        }
        Ok(())
    }
}

/// Entry point used by the binary.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(
        cli.config.as_deref(),
        cli.log_level.as_deref(),
        cli.tasks.as_deref(),
    )?;
    init_logging(&settings)?;

    let app = App::open(&settings)?;

    match cli.command {
        Commands::Shell { token } => {
            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            app.run_shell(&token, stdin, &mut stdout).await
        }
        command => {
            let reply = app.execute(command).await?;
            println!("{}", reply.body);
            if let Some(e) = reply.follow_up_error {
                anyhow::bail!(e);
            }
            if !reply.ok {
                anyhow::bail!("Request failed");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SNAPSHOT: &str = r#"[
        {"_id":"1","userId":"alice","TaskTitle":"Buy groceries","Task":"Milk and eggs"},
        {"_id":"2","userId":"alice","TaskTitle":"Finish report","Task":"Quarterly numbers"},
        {"_id":"3","userId":"bob","TaskTitle":"Report bug"}
    ]"#;

    fn create_test_app() -> (TempDir, App) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tasks.json");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let mut settings = Settings::default();
        settings.tasks_path = path.to_string_lossy().to_string();
        settings
            .auth
            .tokens
            .insert("tok-alice".to_string(), "alice".to_string());

        let app = App::open(&settings).unwrap();
        (temp_dir, app)
    }

    fn parse(reply: &Reply) -> serde_json::Value {
        serde_json::from_str(&reply.body).unwrap()
    }

    #[tokio::test]
    async fn test_execute_search() {
        let (_dir, app) = create_test_app();
        let reply = app
            .execute(Commands::Search {
                token: "tok-alice".to_string(),
                terms: vec!["report".to_string(), "milk".to_string()],
            })
            .await
            .unwrap();
        assert!(reply.ok);

        let body = parse(&reply);
        assert_eq!(body["count"], 2);
        assert_eq!(body["tasks"][0]["id"], "1");
        assert_eq!(body["tasks"][1]["TaskTitle"], "Finish report");
    }

    #[tokio::test]
    async fn test_execute_bad_token() {
        let (_dir, app) = create_test_app();
        let reply = app
            .execute(Commands::List {
                token: "forged".to_string(),
            })
            .await
            .unwrap();
        assert!(!reply.ok);

        let body = parse(&reply);
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 401);
        assert_eq!(body["message"], "Invalid token");
    }

    #[tokio::test]
    async fn test_delete_saves_snapshot() {
        let (dir, app) = create_test_app();
        let reply = app
            .execute(Commands::Delete {
                token: "tok-alice".to_string(),
                task_id: "1".to_string(),
            })
            .await
            .unwrap();
        assert!(reply.ok);

        let reopened = TaskStore::open(&dir.path().join("tasks.json")).unwrap();
        assert_eq!(reopened.len().unwrap(), 2);
        assert!(reopened.find_owned("1", "alice").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reply_survives_save_failure() {
        let (dir, mut app) = create_test_app();
        // A directory cannot be written as a file
        app.tasks_path = dir.path().to_path_buf();

        let reply = app
            .execute(Commands::Delete {
                token: "tok-alice".to_string(),
                task_id: "1".to_string(),
            })
            .await
            .unwrap();

        assert!(reply.ok);
        assert_eq!(parse(&reply)["message"], "Task deleted successfully");
        assert!(reply
            .follow_up_error
            .as_deref()
            .unwrap()
            .starts_with("Failed to save task snapshot"));
        assert!(app.service().store().find_owned("1", "alice").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_snapshot() {
        let (dir, app) = create_test_app();
        let path = dir.path().join("tasks.json");
        let before = std::fs::read_to_string(&path).unwrap();

        let reply = app
            .execute(Commands::Delete {
                token: "tok-alice".to_string(),
                task_id: "3".to_string(),
            })
            .await
            .unwrap();
        assert!(!reply.ok);
        assert_eq!(parse(&reply)["status"], 404);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_shell_session() {
        let (_dir, app) = create_test_app();
        let input: &[u8] = b"build\nsearch groceries\n\ndelete 1\nterm groceries\nbogus\nquit\nlist\n";
        let mut out = Vec::new();

        app.run_shell("tok-alice", input, &mut out).await.unwrap();

        let output = String::from_utf8(out).unwrap();
        let replies: Vec<serde_json::Value> = serde_json::Deserializer::from_str(&output)
            .into_iter::<serde_json::Value>()
            .map(|v| v.unwrap())
            .collect();

        // Nothing after quit is served
        assert_eq!(replies.len(), 5);
        assert_eq!(replies[0]["indexed_count"], 2);
        assert_eq!(replies[1]["count"], 1);
        assert_eq!(replies[2]["message"], "Task deleted successfully");
        assert_eq!(replies[3]["count"], 0);
        assert_eq!(replies[4]["message"], "Unknown command: bogus");
    }

    #[tokio::test]
    async fn test_shell_usage_errors() {
        let (_dir, app) = create_test_app();
        let input: &[u8] = b"search\nterm\ndelete\n";
        let mut out = Vec::new();

        app.run_shell("tok-alice", input, &mut out).await.unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("Usage: search <terms...>"));
        assert!(output.contains("Usage: term <term>"));
        assert!(output.contains("Usage: delete <task-id>"));
    }

    #[tokio::test]
    async fn test_shell_rejected_by_execute() {
        let (_dir, app) = create_test_app();
        let result = app
            .execute(Commands::Shell {
                token: "tok-alice".to_string(),
            })
            .await;
        assert!(result.is_err());
    }
}
