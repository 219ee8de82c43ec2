//! Chat-webhook notifier.
//!
//! POST <url> with `{"content": "<text>"}`.

use std::time::Duration;

use async_trait::async_trait;
use relay_types::{RelayError, Result};
use serde::Serialize;
use tracing::debug;

use crate::{Notification, Notifier};

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

/// Webhook client.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(10_000);
        Self {
            url: url.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Post raw text.
    pub async fn send(&self, content: &str) -> Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(&WebhookMessage { content })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RelayError::Notify(format!("webhook request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::Notify(format!(
                "webhook returned status {}: {}",
                status, body
            )));
        }

        debug!("webhook delivered");
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.send(&notification.to_string()).await
    }
}
