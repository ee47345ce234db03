// src/formatting.rs

use crate::core::{Change, Criticality};
use crate::dispatch::NotificationPayload;
use itertools::Itertools;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Name shown as the author of chat messages.
pub const BOT_NAME: &str = "SchemaWatch";

const SEVERITY_ORDER: [Criticality; 3] = [
    Criticality::Breaking,
    Criticality::Dangerous,
    Criticality::NonBreaking,
];

/// A trait for turning a notification payload into a channel's request body.
pub trait PayloadFormatter: Send + Sync {
    fn format(&self, payload: &NotificationPayload) -> Value;
}

fn title(criticality: Criticality) -> &'static str {
    match criticality {
        Criticality::Breaking => "Breaking changes",
        Criticality::Dangerous => "Dangerous changes",
        Criticality::NonBreaking => "Safe changes",
    }
}

fn color(criticality: Criticality) -> u32 {
    match criticality {
        Criticality::Breaking => 0xE74C3B,
        Criticality::Dangerous => 0xF0C418,
        Criticality::NonBreaking => 0x23B99A,
    }
}

fn pluralize(count: usize) -> &'static str {
    if count == 1 {
        "change"
    } else {
        "changes"
    }
}

/// Groups changes by criticality, most severe first, keeping their order.
fn grouped(changes: &[Change]) -> Vec<(Criticality, Vec<&Change>)> {
    let mut groups = changes.iter().into_group_map_by(|change| change.criticality);
    SEVERITY_ORDER
        .iter()
        .filter_map(|criticality| groups.remove(criticality).map(|group| (*criticality, group)))
        .collect()
}

fn commit_url(payload: &NotificationPayload) -> Option<String> {
    payload.commit.as_ref().map(|commit| {
        format!(
            "https://github.com/{}/{}/commit/{}",
            payload.owner, payload.repo, commit
        )
    })
}

/// Renders quoted names (`'Query.user'`) as inline code.
fn coderize(message: &str) -> String {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    let quoted = QUOTED.get_or_init(|| Regex::new(r"'([^']+)'").expect("valid regex"));
    quoted.replace_all(message, "`$1`").into_owned()
}

/// A formatter for Slack incoming webhooks using message attachments.
pub struct SlackFormatter;

impl SlackFormatter {
    fn schema_name(&self, payload: &NotificationPayload) -> String {
        match commit_url(payload) {
            Some(url) => format!(
                "{} schema (<{}|{}/{}>)",
                payload.environment, url, payload.owner, payload.repo
            ),
            None => format!("{} schema", payload.environment),
        }
    }
}

impl PayloadFormatter for SlackFormatter {
    fn format(&self, payload: &NotificationPayload) -> Value {
        let total = payload.changes.len();
        let attachments: Vec<Value> = grouped(&payload.changes)
            .into_iter()
            .map(|(criticality, changes)| {
                let text = changes.iter().map(|c| coderize(&c.message)).join("\n");
                json!({
                    "mrkdwn_in": ["text", "fallback"],
                    "color": format!("#{:06X}", color(criticality)),
                    "author_name": title(criticality),
                    "text": text,
                    "fallback": text,
                })
            })
            .collect();

        json!({
            "username": BOT_NAME,
            "text": format!(
                ":male-detective: Hi, I found *{} {}* in {}:",
                total,
                pluralize(total),
                self.schema_name(payload)
            ),
            "attachments": attachments,
        })
    }
}

/// A formatter for Discord webhooks using embeds.
pub struct DiscordFormatter;

impl DiscordFormatter {
    fn schema_name(&self, payload: &NotificationPayload) -> String {
        match commit_url(payload) {
            Some(url) => format!(
                "{} schema ([{}/{}]({}))",
                payload.environment, payload.owner, payload.repo, url
            ),
            None => format!("{} schema", payload.environment),
        }
    }
}

impl PayloadFormatter for DiscordFormatter {
    fn format(&self, payload: &NotificationPayload) -> Value {
        let total = payload.changes.len();
        let embeds: Vec<Value> = grouped(&payload.changes)
            .into_iter()
            .map(|(criticality, changes)| {
                json!({
                    "title": title(criticality),
                    "description": changes.iter().map(|c| coderize(&c.message)).join("\n"),
                    "color": color(criticality),
                })
            })
            .collect();

        json!({
            "username": BOT_NAME,
            "content": format!(
                ":detective: Hi, I found **{} {}** in {}:",
                total,
                pluralize(total),
                self.schema_name(payload)
            ),
            "embeds": embeds,
        })
    }
}

/// A formatter for generic JSON webhooks.
pub struct JsonFormatter;

impl PayloadFormatter for JsonFormatter {
    fn format(&self, payload: &NotificationPayload) -> Value {
        let changes: Vec<Value> = payload
            .changes
            .iter()
            .map(|change| {
                json!({
                    "message": change.message,
                    "level": change.criticality.as_str(),
                    "kind": change.kind,
                    "path": change.path,
                })
            })
            .collect();

        json!({
            "environment": payload.environment,
            "repo": payload.repo,
            "owner": payload.owner,
            "commit": payload.commit,
            "changes": changes,
        })
    }
}
