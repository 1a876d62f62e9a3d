//! Issue tracker boundary.
//!
//! The pipeline only needs four operations from a tracker: query candidate
//! tasks, comment, list transitions and execute one. `JiraClient` is the
//! production implementation.

pub mod jira;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::TrackerConfig;
use crate::models::Task;

pub use jira::JiraClient;

/// Filter used to pull pending work items.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeQuery {
    pub project_key: String,
    pub status: String,
    pub labels: Vec<String>,
    pub max_results: u32,
}

impl IntakeQuery {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            project_key: config.project_key.clone(),
            status: config.intake_status.clone(),
            labels: config.labels.clone(),
            max_results: config.max_results,
        }
    }

    /// Highest priority first, oldest first within a priority.
    pub fn to_jql(&self) -> String {
        let labels = self
            .labels
            .iter()
            .map(|l| quote(l))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "project = {} AND status = {} AND labels IN ({}) ORDER BY priority DESC, created ASC",
            quote(&self.project_key),
            quote(&self.status),
            labels
        )
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// A status change the tracker currently allows for an issue.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub id: String,
    pub name: String,
    /// Name of the destination status.
    pub to: String,
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn search(&self, query: &IntakeQuery) -> Result<Vec<Task>>;

    async fn add_comment(&self, key: &str, body: &str) -> Result<()>;

    async fn transitions(&self, key: &str) -> Result<Vec<Transition>>;

    /// Execute a transition, optionally setting fields on the way.
    async fn transition(&self, key: &str, transition_id: &str, fields: Option<serde_json::Value>) -> Result<()>;
}

/// First transition whose name or destination contains `target`, case-insensitively.
pub fn find_transition<'a>(transitions: &'a [Transition], target: &str) -> Option<&'a Transition> {
    let target = target.to_lowercase();
    transitions
        .iter()
        .find(|t| t.name.to_lowercase().contains(&target) || t.to.to_lowercase().contains(&target))
}
