use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{IntakeQuery, IssueTracker, Transition};
use crate::config::TrackerConfig;
use crate::models::Task;

const SEARCH_FIELDS: &[&str] = &["summary", "description", "priority", "labels", "assignee"];

/// Jira REST v2 client using basic auth (user + API token).
#[derive(Debug, Clone)]
pub struct JiraClient {
    base_url: String,
    username: String,
    api_token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Debug, Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraFields,
}

#[derive(Debug, Deserialize)]
struct JiraFields {
    #[serde(default)]
    summary: String,
    description: Option<String>,
    priority: Option<Named>,
    /// Plain strings on most instances, `{name}` objects on some.
    #[serde(default)]
    labels: Vec<Value>,
    assignee: Option<Assignee>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Assignee {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<JiraTransition>,
}

#[derive(Debug, Deserialize)]
struct JiraTransition {
    id: String,
    name: String,
    to: Option<Named>,
}

impl From<JiraIssue> for Task {
    fn from(issue: JiraIssue) -> Self {
        let labels = issue
            .fields
            .labels
            .into_iter()
            .filter_map(|label| match label {
                Value::String(s) => Some(s),
                Value::Object(obj) => obj.get("name").and_then(|n| n.as_str()).map(str::to_string),
                _ => None,
            })
            .collect();
        Task {
            key: issue.key,
            summary: issue.fields.summary,
            description: issue.fields.description.filter(|d| !d.trim().is_empty()),
            priority: issue.fields.priority.map(|p| p.name),
            labels,
            assignee: issue.fields.assignee.and_then(|a| a.display_name),
        }
    }
}

impl JiraClient {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            api_token: config.api_token.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn search(&self, query: &IntakeQuery) -> anyhow::Result<Vec<Task>> {
        let body = json!({
            "jql": query.to_jql(),
            "startAt": 0,
            "maxResults": query.max_results,
            "fields": SEARCH_FIELDS,
        });
        let resp: SearchResponse = self
            .post("search")
            .json(&body)
            .send()
            .await
            .context("Failed to send search request to Jira")?
            .error_for_status()
            .context("Jira search returned error status")?
            .json()
            .await
            .context("Failed to parse Jira search response")?;
        Ok(resp.issues.into_iter().map(Task::from).collect())
    }

    async fn add_comment(&self, key: &str, body: &str) -> anyhow::Result<()> {
        self.post(&format!("issue/{}/comment", key))
            .json(&json!({ "body": body }))
            .send()
            .await
            .with_context(|| format!("Failed to send comment for {}", key))?
            .error_for_status()
            .with_context(|| format!("Jira rejected comment for {}", key))?;
        Ok(())
    }

    async fn transitions(&self, key: &str) -> anyhow::Result<Vec<Transition>> {
        let resp: TransitionsResponse = self
            .get(&format!("issue/{}/transitions", key))
            .send()
            .await
            .with_context(|| format!("Failed to list transitions for {}", key))?
            .error_for_status()
            .with_context(|| format!("Jira transitions for {} returned error status", key))?
            .json()
            .await
            .context("Failed to parse Jira transitions response")?;
        Ok(resp
            .transitions
            .into_iter()
            .map(|t| Transition {
                id: t.id,
                name: t.name,
                to: t.to.map(|s| s.name).unwrap_or_default(),
            })
            .collect())
    }

    async fn transition(&self, key: &str, transition_id: &str, fields: Option<Value>) -> anyhow::Result<()> {
        let mut body = json!({ "transition": { "id": transition_id } });
        if let Some(fields) = fields {
            body["fields"] = fields;
        }
        self.post(&format!("issue/{}/transitions", key))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send transition for {}", key))?
            .error_for_status()
            .with_context(|| format!("Jira rejected transition {} for {}", transition_id, key))?;
        Ok(())
    }
}
