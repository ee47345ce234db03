//! Delivery channels for schema change notifications.
//!
//! Each channel is a [`WebhookClient`] paired with the formatter for that
//! channel's request body. [`default_registry`] declares the built-in channels;
//! supporting a new one means adding an entry there.

pub mod webhook;

use crate::config::HttpConfig;
use crate::dispatch::ChannelRegistry;
use crate::formatting::{DiscordFormatter, JsonFormatter, SlackFormatter};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

pub use webhook::WebhookClient;

pub const SLACK: &str = "slack";
pub const DISCORD: &str = "discord";
pub const WEBHOOK: &str = "webhook";

/// Registry with the Slack, Discord and generic webhook channels.
pub fn default_registry(config: &HttpConfig) -> Result<ChannelRegistry> {
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()?;
    let timeout = Duration::from_secs(config.timeout_seconds);

    Ok(ChannelRegistry::new()
        .register(
            SLACK,
            Arc::new(WebhookClient::new(SLACK, client.clone(), Box::new(SlackFormatter), timeout)),
        )
        .register(
            DISCORD,
            Arc::new(WebhookClient::new(DISCORD, client.clone(), Box::new(DiscordFormatter), timeout)),
        )
        .register(
            WEBHOOK,
            Arc::new(WebhookClient::new(WEBHOOK, client, Box::new(JsonFormatter), timeout)),
        ))
}
