use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A unit of work pulled from the issue tracker. Never mutated during a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
}

impl Task {
    pub fn new(key: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            summary: summary.into(),
            ..Default::default()
        }
    }
}

/// A local checkout bound 1:1 to a task key.
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    pub dir: PathBuf,
    pub branch: String,
    pub base_branch: String,
}

/// Which build ecosystem's test command was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunnerKind {
    Maven,
    MavenWrapper,
    Gradle,
    GradleWrapper,
    Npm,
    Pytest,
    Dotnet,
    Go,
    Make,
    None,
}

impl RunnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maven => "maven",
            Self::MavenWrapper => "maven-wrapper",
            Self::Gradle => "gradle",
            Self::GradleWrapper => "gradle-wrapper",
            Self::Npm => "npm",
            Self::Pytest => "pytest",
            Self::Dotnet => "dotnet",
            Self::Go => "go",
            Self::Make => "make",
            Self::None => "none",
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized result of auto-detected test execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub success: bool,
    pub kind: RunnerKind,
    pub stdout: String,
    pub stderr: String,
}

impl TestOutcome {
    /// Outcome for a workspace with no recognized test setup. Not a failure.
    pub fn none() -> Self {
        Self {
            success: true,
            kind: RunnerKind::None,
            stdout: "No automated test setup detected; accepted by default".to_string(),
            stderr: String::new(),
        }
    }
}

/// What happened when publishing the branch for review.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    Created { url: String, id: u64 },
    /// Code host credentials are not configured.
    Skipped { reason: String },
    Failed { error: String },
}

impl ReviewOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Created { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Explanation for a review request that was not created.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Created { .. } => None,
            Self::Skipped { reason } => Some(reason),
            Self::Failed { error } => Some(error),
        }
    }
}

/// Aggregate outcome for one task; consumed by status synchronization, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub success: bool,
    pub workspace_dir: PathBuf,
    pub branch: Option<String>,
    pub test: Option<TestOutcome>,
    pub review: Option<ReviewOutcome>,
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn failed(workspace_dir: PathBuf, error: impl Into<String>) -> Self {
        Self {
            success: false,
            workspace_dir,
            branch: None,
            test: None,
            review: None,
            error: Some(error.into()),
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        let tests_ok = self.test.as_ref().is_some_and(|t| t.success);
        let review_ok = self.review.as_ref().is_some_and(ReviewOutcome::success);
        match (self.success, tests_ok && review_ok) {
            (true, true) => OutcomeStatus::Success,
            (true, false) => OutcomeStatus::Partial,
            (false, _) => OutcomeStatus::Failure,
        }
    }
}

/// Tri-state status reported in notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    /// The pipeline succeeded but tests or the review request did not.
    Partial,
    Failure,
}

impl OutcomeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "Full success",
            Self::Partial => "Partial success",
            Self::Failure => "Failure",
        }
    }
}

/// Counts of successful and failed tasks across one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, result: &PipelineResult) {
        if result.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded, self.failed)
    }
}
