//! A client for posting notifications to chat and generic JSON webhooks.

use crate::core::NotificationSender;
use crate::dispatch::NotificationPayload;
use crate::formatting::PayloadFormatter;
use anyhow::Context;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Posts a formatted payload to a webhook URL.
pub struct WebhookClient {
    name: &'static str,
    client: reqwest::Client,
    formatter: Box<dyn PayloadFormatter>,
    timeout: Duration,
}

impl WebhookClient {
    /// Creates a new `WebhookClient`.
    pub fn new(
        name: &'static str,
        client: reqwest::Client,
        formatter: Box<dyn PayloadFormatter>,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            client,
            formatter,
            timeout,
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookClient {
    /// Formats the payload and posts it to `target`.
    #[instrument(skip(self, target, payload), fields(channel = self.name, changes = payload.changes.len()))]
    async fn send(&self, target: &str, payload: &NotificationPayload) -> anyhow::Result<()> {
        let body = self.formatter.format(payload);

        debug!("Posting notification");
        let response = self
            .client
            .post(target)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("HTTP request to {} webhook failed", self.name))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        error!(
            status = %status,
            body = %text,
            "{} webhook rejected the notification", self.name
        );
        anyhow::bail!(
            "{} webhook responded with status {}, body: {}",
            self.name,
            status,
            text
        );
    }
}
