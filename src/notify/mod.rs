//! Chat notifications.
//!
//! Cards follow the Office 365 connector `MessageCard` schema, which is what
//! incoming chat webhooks accept. Delivery is best-effort everywhere it is
//! used: callers log failures and move on.

pub mod teams;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::models::{OutcomeStatus, PipelineResult, ReviewOutcome, Task};

pub use teams::TeamsWebhook;

const STARTED_COLOR: &str = "0078D4";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, card: &MessageCard) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageCard {
    #[serde(rename = "@type")]
    pub card_type: &'static str,
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "themeColor")]
    pub theme_color: String,
    pub summary: String,
    pub sections: Vec<Section>,
    #[serde(rename = "potentialAction", skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub activity_title: String,
    pub activity_subtitle: String,
    pub facts: Vec<Fact>,
    pub markdown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    #[serde(rename = "@type")]
    pub action_type: &'static str,
    pub name: String,
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub os: &'static str,
    pub uri: String,
}

impl Action {
    pub fn open_uri(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            action_type: "OpenUri",
            name: name.into(),
            targets: vec![Target {
                os: "default",
                uri: uri.into(),
            }],
        }
    }
}

impl MessageCard {
    fn new(theme_color: &str, summary: String, section: Section, actions: Vec<Action>) -> Self {
        Self {
            card_type: "MessageCard",
            context: "https://schema.org/extensions",
            theme_color: theme_color.to_string(),
            summary,
            sections: vec![section],
            actions,
        }
    }
}

#[cfg(test)]
impl MessageCard {
    /// Value of the fact named `name` in the first section.
    pub fn fact(&self, name: &str) -> Option<&str> {
        self.sections
            .first()?
            .facts
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

fn fact(name: &str, value: impl Into<String>) -> Fact {
    Fact {
        name: name.to_string(),
        value: value.into(),
    }
}

fn theme_color(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Success => "00FF00",
        OutcomeStatus::Partial => "FFA500",
        OutcomeStatus::Failure => "FF0000",
    }
}

fn status_icon(status: OutcomeStatus) -> &'static str {
    match status {
        OutcomeStatus::Success => "✅",
        OutcomeStatus::Partial => "⚠️",
        OutcomeStatus::Failure => "❌",
    }
}

/// Links attached to the final outcome card.
#[derive(Debug, Clone)]
pub struct CardLinks {
    pub task_url: String,
    pub ci_pipeline_url: Option<String>,
}

/// Card announcing that automation has started on a task.
pub fn started_card(task: &Task, task_url: &str, started_at: DateTime<Local>) -> MessageCard {
    let section = Section {
        activity_title: "🚀 **Automation in progress**".to_string(),
        activity_subtitle: format!("Task {} - Started", task.key),
        facts: vec![
            fact("Task", format!("[{}]({}) - {}", task.key, task_url, task.summary)),
            fact("Started at", started_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            fact("Process", "Coding agent at work..."),
        ],
        markdown: true,
    };
    MessageCard::new(STARTED_COLOR, format!("Task {} started", task.key), section, Vec::new())
}

/// Card reporting the final outcome of a task.
pub fn outcome_card(task: &Task, result: &PipelineResult, links: &CardLinks) -> MessageCard {
    let status = result.status();

    let tests = match &result.test {
        Some(t) if t.success => format!("✅ {} passed", t.kind.as_str().to_uppercase()),
        Some(t) => format!("❌ {} failed", t.kind.as_str().to_uppercase()),
        None => "Not run".to_string(),
    };
    let review = match &result.review {
        Some(ReviewOutcome::Created { .. }) => "✅ Created",
        Some(ReviewOutcome::Skipped { .. }) => "⚠️ Skipped",
        Some(ReviewOutcome::Failed { .. }) => "❌ Error",
        None => "Not attempted",
    };

    let mut facts = vec![
        fact("Task", format!("[{}]({}) - {}", task.key, links.task_url, task.summary)),
        fact("Priority", task.priority.clone().unwrap_or_else(|| "Not set".to_string())),
        fact("Assignee", task.assignee.clone().unwrap_or_else(|| "Unassigned".to_string())),
        fact("Branch", result.branch.clone().unwrap_or_else(|| "N/A".to_string())),
        fact("Tests", tests),
        fact("Review request", review),
    ];
    if let Some(error) = &result.error {
        facts.push(fact("Error", error.clone()));
    }

    let mut actions = vec![Action::open_uri("View task", &links.task_url)];
    if let Some(url) = result.review.as_ref().and_then(ReviewOutcome::url) {
        actions.push(Action::open_uri("View review request", url));
    }
    if let Some(ci) = &links.ci_pipeline_url {
        actions.push(Action::open_uri("View CI logs", ci));
    }

    let section = Section {
        activity_title: format!("{} **Task automation**", status_icon(status)),
        activity_subtitle: format!("Task {} - {}", task.key, status.label()),
        facts,
        markdown: true,
    };
    MessageCard::new(theme_color(status), format!("Automated task: {}", task.key), section, actions)
}
