//! Notification delivery.
//!
//! Delivery is fire-and-forget: a sink never reports failure to its caller.
//! Sinks that can fail log the failure and move on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use sitegate_core::{Notification, QualityConfig};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Where alert notifications go.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a notification.
    async fn publish(&self, notification: &Notification);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn publish(&self, notification: &Notification) {
        info!(
            recipient = %notification.recipient,
            alert = %notification.alert_id,
            task = %notification.task_id,
            priority = %notification.priority,
            "{}",
            notification.title
        );
    }
}

/// Keeps notifications in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    published: Mutex<Vec<Notification>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, oldest first.
    pub async fn published(&self) -> Vec<Notification> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn publish(&self, notification: &Notification) {
        self.published.lock().await.push(notification.clone());
    }
}

/// POSTs notifications as JSON to a webhook.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    /// Create a webhook sink with a bounded request timeout.
    pub fn new(url: impl Into<String>) -> reqwest::Result<Self> {
        let client = ClientBuilder::new().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn publish(&self, notification: &Notification) {
        debug!(url = %self.url, alert = %notification.alert_id, "Posting notification");

        match self.client.post(&self.url).json(notification).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(url = %self.url, status = %response.status(), "Webhook rejected notification");
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Webhook delivery failed");
            }
        }
    }
}

/// Pick the sink described by configuration.
pub fn sink_from_config(config: &QualityConfig) -> Arc<dyn NotificationSink> {
    match config.webhook_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => match WebhookSink::new(url) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                warn!(url, error = %e, "Webhook client unavailable, notifications go to the log");
                Arc::new(LogSink)
            }
        },
        _ => Arc::new(LogSink),
    }
}
