//! Delivery of budget alerts.

use std::time::Duration;

use async_trait::async_trait;
use engine::{EngineError, Notifier};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook answered {0}")]
    Status(reqwest::StatusCode),
}

impl From<NotifyError> for EngineError {
    fn from(err: NotifyError) -> Self {
        EngineError::Transport(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Posts each alert as JSON to an HTTP endpoint (a mail relay, a chat hook).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EngineError> {
        self.post(&WebhookPayload { to, subject, body }).await?;
        tracing::debug!(to, subject, "alert delivered to webhook");
        Ok(())
    }
}

/// Logs alerts instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EngineError> {
        tracing::info!(to, subject, body, "budget alert (log only)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_flat() {
        let payload = WebhookPayload {
            to: "alice@example.com",
            subject: "Budget Alert: 50% spent!",
            body: "Hi",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "to": "alice@example.com",
                "subject": "Budget Alert: 50% spent!",
                "body": "Hi",
            })
        );
    }

    #[test]
    fn status_errors_become_transport_errors() {
        let err = EngineError::from(NotifyError::Status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(matches!(err, EngineError::Transport(msg) if msg.contains("502")));
    }

    #[tokio::test]
    async fn unreachable_webhook_is_a_transport_error() {
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/alerts", Duration::from_secs(2)).unwrap();
        let err = notifier
            .send("alice@example.com", "subject", "body")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Transport(_)));
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        LogNotifier.send("a@b.c", "s", "b").await.unwrap();
    }
}
