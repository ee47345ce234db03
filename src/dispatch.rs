//! Concurrent, failure-isolated fan-out of a change notification.
//!
//! One [`DeliveryTask`] is planned per registered channel that has a target in
//! the environment's notifications. All tasks borrow the same
//! [`NotificationPayload`], so every channel sees the same change set. Tasks
//! are polled together on the caller's task; a failing sender is reported to
//! the [`ErrorHandler`] and never affects its siblings.

use crate::core::{Change, NotificationSender};
use crate::environment::Notifications;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Data delivered to every channel of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub changes: Vec<Change>,
    pub environment: String,
    pub repo: String,
    pub owner: String,
    pub commit: Option<String>,
}

/// Ordered mapping of channel id to the sender that delivers to it.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    senders: Vec<(String, Arc<dyn NotificationSender>)>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sender for a channel, replacing any previous one.
    pub fn register(mut self, channel: impl Into<String>, sender: Arc<dyn NotificationSender>) -> Self {
        let channel = channel.into();
        match self.senders.iter_mut().find(|(id, _)| *id == channel) {
            Some(entry) => entry.1 = sender,
            None => self.senders.push((channel, sender)),
        }
        self
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.senders.iter().map(|(id, _)| id.as_str())
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.senders.iter().any(|(id, _)| id == channel)
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.channels()).finish()
    }
}

/// One delivery to one channel.
pub struct DeliveryTask<'a> {
    pub channel: &'a str,
    pub target: &'a str,
    pub payload: &'a NotificationPayload,
    sender: &'a dyn NotificationSender,
}

/// A single channel's delivery failure.
#[derive(Error, Debug)]
#[error("failed to send a notification via {channel}")]
pub struct DeliveryError {
    pub channel: String,
    #[source]
    pub source: anyhow::Error,
}

/// Sink for isolated per-channel failures.
pub trait ErrorHandler: Send + Sync {
    fn on_error(&self, error: &DeliveryError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&DeliveryError) + Send + Sync,
{
    fn on_error(&self, error: &DeliveryError) {
        self(error)
    }
}

/// Which channels were delivered to and which failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// Builds one task per registered channel with an active target.
pub fn plan<'a>(
    registry: &'a ChannelRegistry,
    notifications: &'a Notifications,
    payload: &'a NotificationPayload,
) -> Vec<DeliveryTask<'a>> {
    for channel in notifications.channels() {
        if !registry.contains(channel) {
            debug!(channel, "No sender registered for configured channel, ignoring");
        }
    }

    registry
        .senders
        .iter()
        .filter_map(|(channel, sender)| {
            notifications.target(channel).map(|target| DeliveryTask {
                channel: channel.as_str(),
                target,
                payload,
                sender: sender.as_ref(),
            })
        })
        .collect()
}

/// Runs all tasks concurrently and waits until every one has settled.
pub async fn dispatch(tasks: Vec<DeliveryTask<'_>>, on_error: &dyn ErrorHandler) -> DispatchReport {
    if tasks.is_empty() {
        debug!("No active channels, nothing to dispatch");
        return DispatchReport::default();
    }

    let runs = tasks.into_iter().map(|task| async move {
        match task.sender.send(task.target, task.payload).await {
            Ok(()) => {
                info!(channel = task.channel, "Notification sent");
                metrics::counter!("schemawatch_notifications_sent_total", "channel" => task.channel.to_string())
                    .increment(1);
                Ok(task.channel)
            }
            Err(source) => {
                let failure = DeliveryError {
                    channel: task.channel.to_string(),
                    source,
                };
                error!(
                    channel = task.channel,
                    error = %failure.source,
                    "Failed to send a notification via {}",
                    task.channel
                );
                metrics::counter!("schemawatch_notifications_failed_total", "channel" => task.channel.to_string())
                    .increment(1);
                on_error.on_error(&failure);
                Err(task.channel)
            }
        }
    });

    let mut report = DispatchReport::default();
    for result in join_all(runs).await {
        match result {
            Ok(channel) => report.delivered.push(channel.to_string()),
            Err(channel) => report.failed.push(channel.to_string()),
        }
    }
    report
}
