use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use super::{MessageCard, Notifier};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Incoming-webhook delivery for chat cards. Only the status code is inspected.
#[derive(Debug, Clone)]
pub struct TeamsWebhook {
    url: String,
    client: reqwest::Client,
}

impl TeamsWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for TeamsWebhook {
    async fn send(&self, card: &MessageCard) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(card)
            .timeout(WEBHOOK_TIMEOUT)
            .send()
            .await
            .context("Failed to deliver chat notification")?
            .error_for_status()
            .context("Chat webhook returned error status")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;
    use crate::notify::started_card;
    use crate::test_support::{Recorded, spawn_server};
    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
    use serde_json::Value;

    fn card() -> MessageCard {
        started_card(&Task::new("PROJ-1", "Fix bug"), "https://jira/browse/PROJ-1", chrono::Local::now())
    }

    #[tokio::test]
    async fn test_posts_card_json() {
        let recorded = Recorded::default();
        let app = Router::new()
            .route(
                "/hook",
                post(|State(rec): State<Recorded>, Json(body): Json<Value>| async move {
                    rec.push(body);
                    "1"
                }),
            )
            .with_state(recorded.clone());
        let base = spawn_server(app).await;

        TeamsWebhook::new(format!("{}/hook", base)).send(&card()).await.unwrap();
        let bodies = recorded.take();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["summary"], "Task PROJ-1 started");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let app = Router::new().route("/hook", post(|| async { StatusCode::BAD_REQUEST }));
        let base = spawn_server(app).await;
        let result = TeamsWebhook::new(format!("{}/hook", base)).send(&card()).await;
        assert!(result.is_err());
    }
}
