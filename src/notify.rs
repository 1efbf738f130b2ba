// src/notify.rs

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

/// Side-effect events emitted after a ledger mutation has been committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    CertificateIssued {
        user_id: i64,
        course_id: i64,
        certificate_id: String,
    },
    BadgeUnlocked {
        user_id: i64,
        course_id: i64,
        badge: String,
    },
}

/// Delivery channel for notifications (email, push, ...).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), String>;
}

/// Writes notifications to the log. Used when no delivery channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), String> {
        tracing::info!(?notification, "Notification dispatched");
        Ok(())
    }
}

/// Fire-and-forget delivery: runs on its own task, failures are only logged.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&notification).await {
            tracing::warn!(?notification, "Notification delivery failed: {}", e);
        }
    });
}
