//! Notification delivery (§6.4): a small trait so the scheduler doesn't
//! hardcode a delivery channel. The only implementation shipped here
//! logs; a deployment wires in email/webhook/Slack by implementing the
//! trait.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification. `payload` carries whatever triggered
    /// the alert (§6.4) so a sink can render a richer message than
    /// `title`/`message` without needing the subscription itself.
    async fn emit(&self, user_id: &str, alert_id: Uuid, title: &str, message: &str, payload: serde_json::Value);
}

/// Default sink: structured log line. Always available, used in tests
/// and as the fallback when no richer sink is configured.
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn emit(&self, user_id: &str, alert_id: Uuid, title: &str, message: &str, payload: serde_json::Value) {
        info!(
            user_id = %user_id,
            alert_id = %alert_id,
            title = %title,
            message = %message,
            payload = %payload,
            "alert fired"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_sink_does_not_panic() {
        LoggingSink
            .emit("user-1", Uuid::new_v4(), "price threshold alert triggered for ACME", "Subscription fired for ACME", serde_json::json!({"ticker": "ACME"}))
            .await;
    }
}
