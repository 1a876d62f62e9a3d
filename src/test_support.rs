//! Test doubles shared by unit tests across the crate.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::host::{CodeHost, CreatedReview, ReviewRequestDraft};
use crate::models::Task;
use crate::notify::{MessageCard, Notifier};
use crate::process::{CommandOutput, CommandRunner};
use crate::tracker::{IntakeQuery, IssueTracker, Transition};

/// One command seen by `ScriptedRunner`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// `program arg1 arg2 ...`
    pub line: String,
    pub cwd: PathBuf,
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    output: CommandOutput,
}

/// Records every command and answers from a script. Unscripted commands exit 0.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    creates: Vec<(String, PathBuf)>,
    spawn_failures: HashSet<String>,
    programs: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs reported as installed by `has_program`.
    pub fn with_programs(mut self, programs: &[&str]) -> Self {
        self.programs.extend(programs.iter().map(|p| p.to_string()));
        self
    }

    /// Answer commands whose line starts with `prefix`. First match wins.
    pub fn on(mut self, prefix: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            output: CommandOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        });
        self
    }

    /// Create directory `rel` under the command's cwd when a matching command runs.
    pub fn creating(mut self, prefix: &str, rel: &str) -> Self {
        self.creates.push((prefix.to_string(), PathBuf::from(rel)));
        self
    }

    /// Make `program` fail to spawn, as if it were not installed.
    pub fn failing_spawn(mut self, program: &str) -> Self {
        self.spawn_failures.insert(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.line).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(Call {
            line: line.clone(),
            cwd: cwd.to_path_buf(),
        });

        if self.spawn_failures.contains(program) {
            anyhow::bail!("No such file or directory: {}", program);
        }
        for (prefix, rel) in &self.creates {
            if line.starts_with(prefix.as_str()) {
                std::fs::create_dir_all(cwd.join(rel))?;
            }
        }
        Ok(self
            .rules
            .iter()
            .find(|r| line.starts_with(r.prefix.as_str()))
            .map(|r| r.output.clone())
            .unwrap_or_default())
    }

    fn has_program(&self, program: &str) -> bool {
        self.programs.contains(program)
    }
}

/// JSON bodies captured by a mock HTTP handler.
#[derive(Debug, Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<Value>>>);

impl Recorded {
    pub fn push(&self, value: Value) {
        self.0.lock().unwrap().push(value);
    }

    pub fn take(&self) -> Vec<Value> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// In-memory issue tracker.
#[derive(Debug, Default)]
pub struct FakeTracker {
    pub tasks: Vec<Task>,
    pub available: Vec<Transition>,
    pub fail_search: bool,
    pub fail_comments: bool,
    pub comments: Mutex<Vec<(String, String)>>,
    pub executed: Mutex<Vec<(String, String, Option<Value>)>>,
}

impl FakeTracker {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            available: vec![Transition {
                id: "21".into(),
                name: "Send to review".into(),
                to: "Code Review".into(),
            }],
            ..Default::default()
        }
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub fn executed(&self) -> Vec<(String, String, Option<Value>)> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn search(&self, _query: &IntakeQuery) -> Result<Vec<Task>> {
        if self.fail_search {
            anyhow::bail!("Jira search returned error status");
        }
        Ok(self.tasks.clone())
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<()> {
        if self.fail_comments {
            anyhow::bail!("Jira rejected comment for {}", key);
        }
        self.comments.lock().unwrap().push((key.to_string(), body.to_string()));
        Ok(())
    }

    async fn transitions(&self, _key: &str) -> Result<Vec<Transition>> {
        Ok(self.available.clone())
    }

    async fn transition(&self, key: &str, transition_id: &str, fields: Option<Value>) -> Result<()> {
        self.executed
            .lock()
            .unwrap()
            .push((key.to_string(), transition_id.to_string(), fields));
        Ok(())
    }
}

/// Code host that answers every request the same way.
#[derive(Debug)]
pub struct FakeHost {
    response: std::result::Result<CreatedReview, String>,
    pub drafts: Mutex<Vec<ReviewRequestDraft>>,
}

impl FakeHost {
    pub fn accepting(url: &str, id: u64) -> Self {
        Self {
            response: Ok(CreatedReview {
                url: url.to_string(),
                id,
            }),
            drafts: Mutex::default(),
        }
    }

    pub fn rejecting(error: &str) -> Self {
        Self {
            response: Err(error.to_string()),
            drafts: Mutex::default(),
        }
    }

    pub fn drafts(&self) -> Vec<ReviewRequestDraft> {
        self.drafts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeHost for FakeHost {
    async fn create_review_request(&self, draft: &ReviewRequestDraft) -> Result<CreatedReview> {
        self.drafts.lock().unwrap().push(draft.clone());
        self.response.clone().map_err(anyhow::Error::msg)
    }
}

/// Collects cards instead of posting them.
#[derive(Debug, Default)]
pub struct FakeNotifier {
    pub fail: bool,
    pub cards: Mutex<Vec<MessageCard>>,
}

impl FakeNotifier {
    pub fn cards(&self) -> Vec<MessageCard> {
        self.cards.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, card: &MessageCard) -> Result<()> {
        self.cards.lock().unwrap().push(card.clone());
        if self.fail {
            anyhow::bail!("Chat webhook returned error status");
        }
        Ok(())
    }
}

/// Minimal valid configuration rooted at `working_dir`.
pub fn config(working_dir: &Path) -> crate::config::Config {
    let root = working_dir.to_string_lossy().to_string();
    crate::config::Config::from_lookup(|key| match key {
        "JIRA_HOST" => Some("jira.example.com".into()),
        "JIRA_USERNAME" => Some("bot@example.com".into()),
        "JIRA_API_TOKEN" => Some("token".into()),
        "JIRA_PROJECT_KEY" => Some("PROJ".into()),
        "REPOSITORY_URL" => Some("https://git.example.com/team/app.git".into()),
        "WORKING_DIR" => Some(root.clone()),
        "LOG_DIR" => Some(format!("{}/logs", root)),
        "AGENT_CMD" => Some("agent".into()),
        "TASK_COOLDOWN_SECS" => Some("0".into()),
        _ => None,
    })
    .unwrap()
}
