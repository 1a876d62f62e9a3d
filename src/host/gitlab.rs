use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{CodeHost, CreatedReview, ReviewRequestDraft};
use crate::config::CodeHostConfig;

/// GitLab merge request client (`/api/v4`), authenticated with a private token.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    base_url: String,
    token: String,
    project_id: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MergeRequestResponse {
    web_url: String,
    iid: u64,
}

impl GitLabClient {
    pub fn new(config: &CodeHostConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            project_id: config.project_id.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn merge_requests_url(&self) -> String {
        // Path-style project ids ("group/project") must be URL-encoded.
        format!(
            "{}/api/v4/projects/{}/merge_requests",
            self.base_url,
            self.project_id.replace('/', "%2F")
        )
    }
}

#[async_trait]
impl CodeHost for GitLabClient {
    async fn create_review_request(&self, draft: &ReviewRequestDraft) -> anyhow::Result<CreatedReview> {
        let body = json!({
            "source_branch": draft.source_branch,
            "target_branch": draft.target_branch,
            "title": draft.title,
            "description": draft.description,
            "labels": draft.labels.join(","),
            "remove_source_branch": false,
        });
        let resp = self
            .client
            .post(self.merge_requests_url())
            .header("PRIVATE-TOKEN", &self.token)
            .json(&body)
            .send()
            .await
            .context("Failed to send merge request to GitLab")?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("GitLab returned {}: {}", status, detail.trim());
        }

        let created: MergeRequestResponse = resp
            .json()
            .await
            .context("Failed to parse GitLab merge request response")?;
        Ok(CreatedReview {
            url: created.web_url,
            id: created.iid,
        })
    }
}
