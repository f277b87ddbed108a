//! Outbound notification transport used by budget alerts.

use async_trait::async_trait;

use crate::ResultEngine;

/// Delivers a message to a user's registered address.
///
/// Implementations should map delivery problems to
/// [`EngineError::Transport`](crate::EngineError::Transport); the alert run
/// records them per user and moves on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> ResultEngine<()>;
}
