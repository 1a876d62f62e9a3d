//! Code host boundary: opening review requests.

pub mod gitlab;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub use gitlab::GitLabClient;

/// Everything needed to open a review request for a pushed branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRequestDraft {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
    pub labels: Vec<String>,
}

/// A review request the host accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedReview {
    pub url: String,
    pub id: u64,
}

#[async_trait]
pub trait CodeHost: Send + Sync {
    async fn create_review_request(&self, draft: &ReviewRequestDraft) -> Result<CreatedReview>;
}
