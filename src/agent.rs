//! Delegated execution: hand the task to the external coding agent.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::Config;
use crate::errors::PipelineError;
use crate::models::{Task, Workspace};
use crate::process::CommandRunner;

pub const PROMPT_FILE: &str = "task-prompt.md";
pub const OUTPUT_FILE: &str = "agent-output.txt";

/// Longest stderr excerpt carried in a `DelegatedExecution` error.
const STDERR_EXCERPT: usize = 2000;

const GUIDELINES: &str = "\
1. Read the existing code and follow its structure and conventions.
2. Implement the requested change completely.
3. Add or update tests covering the change.
4. Make sure the project's test suite passes:
   - Java: `mvn test`, `gradle test` or the project wrapper
   - JavaScript/TypeScript: `npm test`
   - Python: `python -m pytest`
   - .NET: `dotnet test`
   - Go: `go test ./...`
   - Anything with a Makefile `test` target: `make test`
5. Do not commit, push or switch branches; the automation does that.";

/// Build the instruction payload handed to the coding agent.
pub fn build_prompt(task: &Task, workspace: &Workspace, config: &Config) -> String {
    let labels = if task.labels.is_empty() {
        "none".to_string()
    } else {
        task.labels.join(", ")
    };
    format!(
        "# Task {key}: {summary}\n\n\
         ## Description\n{description}\n\n\
         ## Details\n\
         - Priority: {priority}\n\
         - Labels: {labels}\n\
         - Branch: {branch} (based on {base})\n\
         - Repository: {repo}\n\
         - Tracker: {url}\n\n\
         ## Guidelines\n{guidelines}\n",
        key = task.key,
        summary = task.summary,
        description = task.description.as_deref().unwrap_or("No description provided."),
        priority = task.priority.as_deref().unwrap_or("Not set"),
        labels = labels,
        branch = workspace.branch,
        base = workspace.base_branch,
        repo = config.git.repository_url.as_deref().unwrap_or("existing local checkout"),
        url = config.tracker.browse_url(&task.key),
        guidelines = GUIDELINES,
    )
}

pub struct AgentExecutor {
    runner: Arc<dyn CommandRunner>,
    config: Arc<Config>,
}

impl AgentExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>, config: Arc<Config>) -> Self {
        Self { runner, config }
    }

    /// Persist the prompt, run the agent to completion in the workspace and
    /// persist its stdout. A non-zero exit is fatal for the task.
    #[instrument(skip_all, fields(task = %task.key))]
    pub async fn execute(&self, task: &Task, workspace: &Workspace) -> Result<(), PipelineError> {
        let prompt = build_prompt(task, workspace, &self.config);
        write_artifact(&workspace.dir, PROMPT_FILE, &prompt)?;

        let mut args = self.config.agent.args.clone();
        args.push(prompt);

        info!(command = %self.config.agent.command, "starting coding agent");
        let output = self
            .runner
            .run(&self.config.agent.command, &args, &workspace.dir)
            .await?;
        write_artifact(&workspace.dir, OUTPUT_FILE, &output.stdout)?;

        if !output.success() {
            return Err(PipelineError::DelegatedExecution {
                exit_code: output.exit_code,
                stderr: excerpt(output.stderr.trim(), STDERR_EXCERPT),
            });
        }
        info!("coding agent finished");
        Ok(())
    }
}

fn write_artifact(dir: &Path, name: &str, content: &str) -> Result<(), PipelineError> {
    let path = dir.join(name);
    std::fs::write(&path, content).map_err(|e| PipelineError::io(path, e))
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
