//! Pipeline orchestrator.
//!
//! Runs each task through
//! `Intake -> WorkspaceReady -> Delegated -> Tested -> Published -> Synced`,
//! one task at a time in intake order, with a cool-down between tasks.
//! Per-task failures become a failed `PipelineResult` that is still synced;
//! only preflight and intake errors stop the run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::agent::AgentExecutor;
use crate::config::Config;
use crate::errors::PipelineError;
use crate::host::{CodeHost, GitLabClient};
use crate::models::{PipelineResult, RunSummary, Task};
use crate::notify::{Notifier, TeamsWebhook};
use crate::process::{CommandRunner, SystemRunner};
use crate::publish::ReviewPublisher;
use crate::sync::StatusSynchronizer;
use crate::test_runner::TestDetector;
use crate::tracker::{IntakeQuery, IssueTracker, JiraClient};
use crate::workspace::WorkspaceManager;

/// Longest stderr excerpt used in a "tests failed" error message.
const TEST_ERROR_EXCERPT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Intake,
    WorkspaceReady,
    Delegated,
    Tested,
    Published,
    Synced,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Intake => "intake",
            Self::WorkspaceReady => "workspace-ready",
            Self::Delegated => "delegated",
            Self::Tested => "tested",
            Self::Published => "published",
            Self::Synced => "synced",
        };
        f.write_str(name)
    }
}

/// The external systems a pipeline talks to.
pub struct Collaborators {
    pub runner: Arc<dyn CommandRunner>,
    pub tracker: Arc<dyn IssueTracker>,
    pub host: Option<Arc<dyn CodeHost>>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl Collaborators {
    /// Production implementations selected by the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            runner: Arc::new(SystemRunner),
            tracker: Arc::new(JiraClient::new(&config.tracker)),
            host: config
                .code_host
                .as_ref()
                .map(|c| Arc::new(GitLabClient::new(c)) as Arc<dyn CodeHost>),
            notifier: config
                .chat_webhook_url
                .as_ref()
                .map(|url| Arc::new(TeamsWebhook::new(url.clone())) as Arc<dyn Notifier>),
        }
    }
}

/// Per-run filters and overrides.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only process these task keys (case-insensitive). Empty means all.
    pub only: Vec<String>,
    pub max_tasks: Option<usize>,
    pub cooldown: Option<Duration>,
}

impl RunOptions {
    fn select(&self, tasks: Vec<Task>) -> Vec<Task> {
        let selected = tasks
            .into_iter()
            .filter(|t| self.only.is_empty() || self.only.iter().any(|k| k.eq_ignore_ascii_case(&t.key)));
        match self.max_tasks {
            Some(max) => selected.take(max).collect(),
            None => selected.collect(),
        }
    }
}

/// Everything a finished run produced, in processing order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub run_id: Uuid,
    pub results: Vec<(Task, PipelineResult)>,
    pub summary: RunSummary,
}

pub struct Pipeline {
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    tracker: Arc<dyn IssueTracker>,
    workspaces: WorkspaceManager,
    agent: AgentExecutor,
    tests: TestDetector,
    publisher: ReviewPublisher,
    sync: StatusSynchronizer,
}

impl Pipeline {
    pub fn new(config: Arc<Config>, collaborators: Collaborators) -> Self {
        let Collaborators {
            runner,
            tracker,
            host,
            notifier,
        } = collaborators;
        Self {
            workspaces: WorkspaceManager::new(runner.clone(), config.clone()),
            agent: AgentExecutor::new(runner.clone(), config.clone()),
            tests: TestDetector::new(runner.clone()),
            publisher: ReviewPublisher::new(runner.clone(), host, config.clone()),
            sync: StatusSynchronizer::new(tracker.clone(), notifier, config.clone()),
            config,
            runner,
            tracker,
        }
    }

    /// Run-level checks performed before any task is touched.
    pub fn preflight(&self) -> Result<(), PipelineError> {
        self.config.ensure_directories()?;
        let agent = &self.config.agent.command;
        if !self.runner.has_program(agent) {
            return Err(PipelineError::config(
                "AGENT_CMD",
                format!("'{}' was not found on PATH", agent),
            ));
        }
        Ok(())
    }

    /// Query the tracker for pending tasks.
    pub async fn intake(&self) -> Result<Vec<Task>, PipelineError> {
        let query = IntakeQuery::from_config(&self.config.tracker);
        info!(stage = %Stage::Intake, jql = %query.to_jql(), "querying tracker");
        self.tracker
            .search(&query)
            .await
            .map_err(|e| PipelineError::Tracker(format!("{:#}", e)))
    }

    /// Preflight, intake, then process every selected task sequentially.
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport, PipelineError> {
        self.preflight()?;
        let tasks = options.select(self.intake().await?);
        let run_id = Uuid::new_v4();
        info!(%run_id, count = tasks.len(), "tasks selected");

        let cooldown = options.cooldown.unwrap_or(self.config.cooldown);
        let mut report = RunReport {
            run_id,
            ..Default::default()
        };
        let total = tasks.len();
        for (index, task) in tasks.into_iter().enumerate() {
            let span = info_span!("task", %run_id, task_key = %task.key);
            let result = self.handle_task(&task).instrument(span).await;
            report.summary.record(&result);
            report.results.push((task, result));

            if index + 1 < total && !cooldown.is_zero() {
                tokio::time::sleep(cooldown).await;
            }
        }

        info!(%run_id, summary = %report.summary, "run finished");
        Ok(report)
    }

    async fn handle_task(&self, task: &Task) -> PipelineResult {
        info!(summary = %task.summary, "processing task");
        self.sync.announce(task).await;

        let result = self.process_task(task).await;
        match &result.error {
            None => info!(status = result.status().label(), "task processed"),
            Some(err) => error!(error = %err, "task failed"),
        }

        let report = self.sync.sync(task, &result).await;
        if report.is_clean() {
            info!(stage = %Stage::Synced, "status synchronized");
        } else {
            warn!(stage = %Stage::Synced, errors = ?report.errors, "status synchronized with errors");
        }
        result
    }

    /// Run one task through workspace, agent, tests and publish. Never fails.
    pub async fn process_task(&self, task: &Task) -> PipelineResult {
        let dir = self.config.task_dir(&task.key);

        let workspace = match self.workspaces.prepare(task).await {
            Ok(workspace) => workspace,
            Err(e) => return PipelineResult::failed(dir, e.to_string()),
        };
        info!(stage = %Stage::WorkspaceReady, branch = %workspace.branch, "workspace ready");

        if let Err(e) = self.agent.execute(task, &workspace).await {
            return PipelineResult {
                branch: Some(workspace.branch),
                ..PipelineResult::failed(workspace.dir, e.to_string())
            };
        }
        info!(stage = %Stage::Delegated, "agent finished");

        let test = self.tests.run(&workspace.dir).await;
        info!(stage = %Stage::Tested, kind = %test.kind, success = test.success, "tests evaluated");
        if !test.success {
            let detail = test.stderr.trim();
            let detail = if detail.is_empty() { test.stdout.trim() } else { detail };
            let error = format!(
                "{} tests failed: {}",
                test.kind,
                detail.chars().take(TEST_ERROR_EXCERPT).collect::<String>()
            );
            return PipelineResult {
                branch: Some(workspace.branch),
                test: Some(test),
                ..PipelineResult::failed(workspace.dir, error)
            };
        }

        let review = self.publisher.publish(task, &workspace).await;
        info!(stage = %Stage::Published, review_ok = review.success(), "publish finished");

        PipelineResult {
            success: true,
            workspace_dir: workspace.dir,
            branch: Some(workspace.branch),
            test: Some(test),
            review: Some(review),
            error: None,
        }
    }
}
