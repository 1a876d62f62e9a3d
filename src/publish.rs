//! Review-request publisher.
//!
//! Commits whatever the coding agent left in the workspace, pushes the branch
//! and opens a review request on the code host when credentials exist.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::errors::PipelineError;
use crate::git::{Git, nothing_to_commit};
use crate::host::{CodeHost, ReviewRequestDraft};
use crate::models::{ReviewOutcome, Task, Workspace};
use crate::process::CommandRunner;

const BASE_LABELS: &[&str] = &["automation", "agent-generated"];

const REVIEW_CHECKLIST: &str = "\
- [ ] Code follows the project's conventions
- [ ] Tests pass
- [ ] Behaviour matches the task description
- [ ] No regressions introduced";

pub struct ReviewPublisher {
    runner: Arc<dyn CommandRunner>,
    host: Option<Arc<dyn CodeHost>>,
    config: Arc<Config>,
}

impl ReviewPublisher {
    pub fn new(runner: Arc<dyn CommandRunner>, host: Option<Arc<dyn CodeHost>>, config: Arc<Config>) -> Self {
        Self { runner, host, config }
    }

    /// Stage, commit and push the workspace, then request review.
    ///
    /// Never fails: push problems are logged, a failed commit or a host error
    /// becomes `ReviewOutcome::Failed`. The push is attempted either way and
    /// nothing is rolled back.
    #[instrument(skip_all, fields(task = %task.key, branch = %workspace.branch))]
    pub async fn publish(&self, task: &Task, workspace: &Workspace) -> ReviewOutcome {
        let git = Git::new(&workspace.dir, self.runner.clone());

        let commit_error = self.commit(&git, task).await.err();
        self.push(&git, &workspace.branch).await;

        if let Some(e) = commit_error {
            warn!(error = %e, "could not commit agent changes, not requesting review");
            return failed(e);
        }

        let Some(host) = &self.host else {
            info!("code host credentials not configured, skipping review request");
            return ReviewOutcome::Skipped {
                reason: "Code host access token or project id not configured; create the review request manually"
                    .to_string(),
            };
        };

        let draft = self.draft(task, workspace);
        match host.create_review_request(&draft).await {
            Ok(created) => {
                info!(url = %created.url, id = created.id, "review request created");
                ReviewOutcome::Created {
                    url: created.url,
                    id: created.id,
                }
            }
            Err(e) => {
                warn!(error = %e, "review request creation failed");
                failed(PipelineError::Publish(format!("{:#}", e)))
            }
        }
    }

    async fn commit(&self, git: &Git, task: &Task) -> Result<(), PipelineError> {
        let added = git.add_all().await?;
        if !added.success() {
            return Err(PipelineError::git("add", added.stderr.trim()));
        }

        let committed = git.commit(&commit_message(task)).await?;
        if committed.success() {
            return Ok(());
        }
        if nothing_to_commit(&committed) {
            info!("agent left no changes to commit");
            return Ok(());
        }
        Err(PipelineError::git("commit", committed.stderr.trim()))
    }

    async fn push(&self, git: &Git, branch: &str) {
        match git.push(branch).await {
            Ok(out) if out.success() => info!("branch pushed"),
            Ok(out) => warn!(exit_code = out.exit_code, stderr = %out.stderr.trim(), "git push failed"),
            Err(e) => warn!(error = %e, "git push could not be started"),
        }
    }

    fn draft(&self, task: &Task, workspace: &Workspace) -> ReviewRequestDraft {
        let mut labels: Vec<String> = BASE_LABELS.iter().map(|l| l.to_string()).collect();
        if let Some(priority) = &task.priority {
            labels.push(priority.to_lowercase());
        }
        ReviewRequestDraft {
            source_branch: workspace.branch.clone(),
            target_branch: workspace.base_branch.clone(),
            title: format!("[{}] {}", task.key, task.summary),
            description: review_description(task, &self.config.tracker.browse_url(&task.key)),
            labels,
        }
    }
}

fn failed(error: PipelineError) -> ReviewOutcome {
    ReviewOutcome::Failed {
        error: error.to_string(),
    }
}

/// `feat(KEY): summary`, followed by the description when there is one.
pub fn commit_message(task: &Task) -> String {
    match &task.description {
        Some(description) => format!("feat({}): {}\n\n{}", task.key, task.summary, description),
        None => format!("feat({}): {}", task.key, task.summary),
    }
}

fn review_description(task: &Task, task_url: &str) -> String {
    format!(
        "## Automated change\n\n\
         **Task:** [{key}]({url})\n\n\
         **Description:**\n{description}\n\n\
         **Priority:** {priority}\n\n\
         ## Generated changes\n\
         - Code generated by the coding agent\n\
         - Tests executed by the automation\n\
         - Branch created from the default branch\n\n\
         ## Review checklist\n{checklist}\n",
        key = task.key,
        url = task_url,
        description = task.description.as_deref().unwrap_or("No description"),
        priority = task.priority.as_deref().unwrap_or("Not set"),
        checklist = REVIEW_CHECKLIST,
    )
}
