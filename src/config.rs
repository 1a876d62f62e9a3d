use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::PipelineError;

const DEFAULT_LABEL: &str = "claude-automation";
const DEFAULT_INTAKE_STATUS: &str = "To Do";
const DEFAULT_REVIEW_STATUS: &str = "Code Review";
const DEFAULT_MAX_RESULTS: u32 = 10;
const DEFAULT_COOLDOWN_SECS: u64 = 2;
const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";

/// Issue tracker connection and intake settings.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Base URL, always with a scheme (`https://` is added to bare hosts).
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    pub project_key: String,
    pub labels: Vec<String>,
    pub intake_status: String,
    pub max_results: u32,
    /// Phrase matched against transition names when a task is ready for review.
    pub review_status: String,
    /// Optional custom field that receives the review-request URL on transition.
    pub review_url_field: Option<String>,
}

impl TrackerConfig {
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }
}

#[derive(Debug, Clone)]
pub struct GitConfig {
    pub repository_url: Option<String>,
    pub default_branch: String,
    pub author_name: String,
    pub author_email: String,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub command: String,
    pub args: Vec<String>,
}

/// Code host credentials. Review requests are skipped when this is absent.
#[derive(Debug, Clone)]
pub struct CodeHostConfig {
    pub base_url: String,
    pub token: String,
    pub project_id: String,
}

/// Runtime configuration, built once at startup and passed to every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub working_dir: PathBuf,
    pub log_dir: PathBuf,
    pub git: GitConfig,
    pub agent: AgentConfig,
    pub code_host: Option<CodeHostConfig>,
    pub chat_webhook_url: Option<String>,
    pub ci_pipeline_url: Option<String>,
    pub cooldown: Duration,
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| PipelineError::config(key, "required environment variable is not set"))
        };

        let tracker = TrackerConfig {
            base_url: normalize_base_url(&require("JIRA_HOST")?),
            username: require("JIRA_USERNAME")?,
            api_token: require("JIRA_API_TOKEN")?,
            project_key: require("JIRA_PROJECT_KEY")?,
            labels: parse_labels(get("TARGET_LABELS").as_deref()),
            intake_status: get("JIRA_INTAKE_STATUS").unwrap_or_else(|| DEFAULT_INTAKE_STATUS.to_string()),
            max_results: parse_number(get("JIRA_MAX_RESULTS"), "JIRA_MAX_RESULTS", DEFAULT_MAX_RESULTS)?,
            review_status: get("JIRA_REVIEW_STATUS").unwrap_or_else(|| DEFAULT_REVIEW_STATUS.to_string()),
            review_url_field: get("JIRA_REVIEW_URL_FIELD"),
        };

        let git = GitConfig {
            repository_url: get("REPOSITORY_URL"),
            default_branch: get("DEFAULT_BRANCH").unwrap_or_else(|| "main".to_string()),
            author_name: get("GIT_AUTHOR_NAME").unwrap_or_else(|| "Task Automation".to_string()),
            author_email: get("GIT_AUTHOR_EMAIL").unwrap_or_else(|| "automation@localhost".to_string()),
        };

        let agent = AgentConfig {
            command: agent_command(get("AGENT_CMD").unwrap_or_else(|| "claude-code".to_string()))?,
            args: get("AGENT_ARGS")
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        };

        let code_host = match (get("GITLAB_ACCESS_TOKEN"), get("GITLAB_PROJECT_ID")) {
            (Some(token), Some(project_id)) => Some(CodeHostConfig {
                base_url: get("GITLAB_URL")
                    .map(|u| normalize_base_url(&u))
                    .unwrap_or_else(|| DEFAULT_GITLAB_URL.to_string()),
                token,
                project_id,
            }),
            _ => None,
        };

        let cooldown_secs = parse_number(get("TASK_COOLDOWN_SECS"), "TASK_COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS)?;

        Ok(Self {
            tracker,
            working_dir: get("WORKING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/workspace")),
            log_dir: get("LOG_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("logs")),
            git,
            agent,
            code_host,
            chat_webhook_url: get("TEAMS_WEBHOOK_URL"),
            ci_pipeline_url: get("CI_PIPELINE_URL"),
            cooldown: Duration::from_secs(cooldown_secs),
        })
    }

    /// Workspace directory for a task: a pure function of the task key.
    pub fn task_dir(&self, key: &str) -> PathBuf {
        self.working_dir.join(key)
    }

    pub fn ensure_directories(&self) -> Result<(), PipelineError> {
        std::fs::create_dir_all(&self.working_dir).map_err(|e| PipelineError::io(&self.working_dir, e))?;
        std::fs::create_dir_all(&self.log_dir).map_err(|e| PipelineError::io(&self.log_dir, e))?;
        Ok(())
    }

    /// Human-readable settings with secrets masked.
    pub fn redacted_summary(&self) -> Vec<(&'static str, String)> {
        let unset = || "(not set)".to_string();
        vec![
            ("Tracker", self.tracker.base_url.clone()),
            ("Tracker user", self.tracker.username.clone()),
            ("Tracker token", redact(&self.tracker.api_token)),
            ("Project", self.tracker.project_key.clone()),
            ("Labels", self.tracker.labels.join(", ")),
            ("Intake status", self.tracker.intake_status.clone()),
            ("Review status", self.tracker.review_status.clone()),
            ("Working dir", self.working_dir.display().to_string()),
            ("Log dir", self.log_dir.display().to_string()),
            ("Repository", self.git.repository_url.clone().unwrap_or_else(unset)),
            ("Default branch", self.git.default_branch.clone()),
            ("Agent", format!("{} {}", self.agent.command, self.agent.args.join(" ")).trim().to_string()),
            (
                "Code host",
                self.code_host
                    .as_ref()
                    .map(|h| format!("{} project {} token {}", h.base_url, h.project_id, redact(&h.token)))
                    .unwrap_or_else(|| "(not configured, review requests skipped)".to_string()),
            ),
            ("Chat webhook", self.chat_webhook_url.as_deref().map(redact).unwrap_or_else(unset)),
            ("CI pipeline", self.ci_pipeline_url.clone().unwrap_or_else(unset)),
            ("Cooldown", format!("{}s", self.cooldown.as_secs())),
        ]
    }
}

/// Split a comma-separated label list, dropping blanks.
pub fn parse_labels(raw: Option<&str>) -> Vec<String> {
    let labels: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if labels.is_empty() {
        vec![DEFAULT_LABEL.to_string()]
    } else {
        labels
    }
}

/// Bare names are resolved on PATH at spawn time. Relative paths are made
/// absolute here because the agent runs with the task workspace as its cwd.
fn agent_command(command: String) -> Result<String, PipelineError> {
    let path = Path::new(&command);
    if path.is_absolute() || path.components().count() < 2 {
        return Ok(command);
    }
    std::path::absolute(path)
        .map(|p| p.to_string_lossy().to_string())
        .map_err(|e| PipelineError::config("AGENT_CMD", format!("cannot resolve '{}': {}", command, e)))
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn parse_number<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, PipelineError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| PipelineError::config(key, format!("expected a non-negative integer, got '{}'", value))),
    }
}

fn redact(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", secret.chars().take(4).collect::<String>())
    }
}
