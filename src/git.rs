//! Git adapter.
//!
//! Source-control operations are opaque `git` subprocess calls judged by exit
//! status. Callers decide which failures matter: clone failures abort a task,
//! a failed pull or push is only logged.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::process::{CommandOutput, CommandRunner, args};

#[derive(Clone)]
pub struct Git {
    workdir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            workdir: workdir.into(),
            runner,
        }
    }

    /// Whether the working directory already holds a checkout.
    pub fn has_repository(&self) -> bool {
        self.workdir.join(".git").exists()
    }

    /// Clone `url` into the working directory itself.
    #[instrument(skip_all, fields(url))]
    pub async fn clone_into(&self, url: &str) -> Result<CommandOutput> {
        self.run(&["clone", url, "."]).await
    }

    /// Set the commit identity for this checkout only. Safe to repeat.
    pub async fn configure_identity(&self, name: &str, email: &str) -> Result<()> {
        for (key, value) in [("user.name", name), ("user.email", email)] {
            let out = self.run(&["config", key, value]).await?;
            if !out.success() {
                debug!(key, stderr = %out.stderr.trim(), "git config failed");
            }
        }
        Ok(())
    }

    pub async fn checkout(&self, branch: &str) -> Result<CommandOutput> {
        self.run(&["checkout", branch]).await
    }

    pub async fn checkout_new_branch(&self, branch: &str) -> Result<CommandOutput> {
        self.run(&["checkout", "-b", branch]).await
    }

    pub async fn pull(&self, branch: &str) -> Result<CommandOutput> {
        self.run(&["pull", "origin", branch]).await
    }

    pub async fn add_all(&self) -> Result<CommandOutput> {
        self.run(&["add", "-A"]).await
    }

    pub async fn commit(&self, message: &str) -> Result<CommandOutput> {
        self.run(&["commit", "-m", message]).await
    }

    pub async fn push(&self, branch: &str) -> Result<CommandOutput> {
        self.run(&["push", "-u", "origin", branch]).await
    }

    async fn run(&self, git_args: &[&str]) -> Result<CommandOutput> {
        self.runner.run("git", &args(git_args), &self.workdir).await
    }
}

/// Deterministic feature branch for a task: `feature/<key>-<summary slug>`.
pub fn branch_name(task_key: &str, summary: &str) -> String {
    format!("feature/{}-{}", task_key.to_lowercase(), slugify(summary, 50))
        .trim_end_matches('-')
        .to_string()
}

/// Lower-case `text`, collapse every run of non `[a-z0-9]` characters into a
/// single `-`, trim separators from both ends and cap the length.
pub fn slugify(text: &str, max_len: usize) -> String {
    let slug = text
        .to_lowercase()
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.len() > max_len {
        slug[..max_len].trim_end_matches('-').to_string()
    } else {
        slug
    }
}

/// Whether a failed `git commit` just means there was nothing to commit.
pub fn nothing_to_commit(output: &CommandOutput) -> bool {
    let text = format!("{}{}", output.stdout, output.stderr);
    text.contains("nothing to commit") || text.contains("no changes added to commit")
}
