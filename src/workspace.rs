//! Task workspaces: one checkout per task key under the working root.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::errors::PipelineError;
use crate::git::{Git, branch_name};
use crate::models::{Task, Workspace};
use crate::process::CommandRunner;

pub struct WorkspaceManager {
    runner: Arc<dyn CommandRunner>,
    config: Arc<Config>,
}

impl WorkspaceManager {
    pub fn new(runner: Arc<dyn CommandRunner>, config: Arc<Config>) -> Self {
        Self { runner, config }
    }

    /// Bring `root/<key>` to a checkout of the task branch. Safe to repeat.
    #[instrument(skip_all, fields(task = %task.key))]
    pub async fn prepare(&self, task: &Task) -> Result<Workspace, PipelineError> {
        let dir = self.config.task_dir(&task.key);
        std::fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;
        let git = Git::new(&dir, self.runner.clone());
        let base_branch = self.config.git.default_branch.clone();

        if !git.has_repository() {
            let url = self.config.git.repository_url.as_deref().ok_or_else(|| {
                PipelineError::config("REPOSITORY_URL", "not set and no existing checkout found")
            })?;
            info!(dir = %dir.display(), "cloning repository");
            let out = git.clone_into(url).await?;
            if !out.success() {
                return Err(PipelineError::git("clone", out.stderr.trim()));
            }
        }

        git.configure_identity(&self.config.git.author_name, &self.config.git.author_email)
            .await?;

        let out = git.checkout(&base_branch).await?;
        if !out.success() {
            warn!(branch = %base_branch, stderr = %out.stderr.trim(), "checkout of default branch failed");
        }
        let out = git.pull(&base_branch).await?;
        if !out.success() {
            warn!(branch = %base_branch, stderr = %out.stderr.trim(), "pull failed, continuing with local state");
        }

        let branch = branch_name(&task.key, &task.summary);
        let created = git.checkout_new_branch(&branch).await?;
        if created.success() {
            info!(%branch, "created task branch");
        } else {
            let existing = git.checkout(&branch).await?;
            if !existing.success() {
                return Err(PipelineError::git(
                    format!("checkout {}", branch),
                    existing.stderr.trim(),
                ));
            }
            info!(%branch, "task branch already exists, checked it out");
        }

        Ok(Workspace {
            dir,
            branch,
            base_branch,
        })
    }
}
