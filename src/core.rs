//! Core domain types and service traits for SchemaWatch
//!
//! This module defines the push event model, the change records produced by
//! schema diffing, and the trait contracts for the collaborators the
//! notification pipeline talks to (file loading, config loading, schema
//! building/diffing and per-channel delivery).

use crate::environment::RawConfig;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Prefix carried by refs that point at a branch head.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// A push event as delivered by the source-control webhook.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct PushEvent {
    /// The full ref that was pushed, e.g. `refs/heads/main`.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// The revision the ref pointed at before the push.
    pub before: String,
    /// The revision the ref points at after the push.
    #[serde(default)]
    pub after: String,
    /// The repository the push happened in.
    #[serde(default)]
    pub repository: Repository,
    /// Commits included in the push. Malformed entries are treated as absent.
    #[serde(default, deserialize_with = "lenient_commits")]
    pub commits: Option<Vec<CommitInfo>>,
}

impl PushEvent {
    /// Returns the branch name if this event is a branch push.
    pub fn branch(&self) -> Option<&str> {
        branch_name(&self.git_ref)
    }

    /// Best-effort id of the first commit in the push.
    pub fn head_commit_id(&self) -> Option<&str> {
        self.commits
            .as_ref()
            .and_then(|commits| commits.first())
            .and_then(|commit| commit.id.as_deref())
    }
}

/// Strips the branch-head prefix from a ref, if it has one.
pub fn branch_name(git_ref: &str) -> Option<&str> {
    git_ref.strip_prefix(BRANCH_REF_PREFIX)
}

/// Repository identity attached to a push event.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub owner: RepositoryOwner,
}

/// GitHub sends `login` for organisations and users, `name` on some payloads.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct RepositoryOwner {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RepositoryOwner {
    pub fn display_name(&self) -> Option<&str> {
        self.login.as_deref().or(self.name.as_deref())
    }
}

/// A single commit of a push event.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct CommitInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn lenient_commits<'de, D>(deserializer: D) -> Result<Option<Vec<CommitInfo>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(entries) = value else {
        return Ok(None);
    };
    // A malformed entry only loses its own fields.
    Ok(Some(
        entries
            .into_iter()
            .map(|entry| serde_json::from_value(entry).unwrap_or_default())
            .collect(),
    ))
}

/// Identifies one schema document at one revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaPointer {
    pub path: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
}

impl fmt::Display for SchemaPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.git_ref, self.path)
    }
}

/// How severe a detected schema change is for existing clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    Breaking,
    Dangerous,
    NonBreaking,
}

impl Criticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criticality::Breaking => "BREAKING",
            Criticality::Dangerous => "DANGEROUS",
            Criticality::NonBreaking => "NON_BREAKING",
        }
    }
}

/// The kind of structural difference a change record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    TypeAdded,
    TypeRemoved,
    TypeKindChanged,
    FieldAdded,
    FieldRemoved,
    FieldTypeChanged,
    ArgumentAdded,
    ArgumentRemoved,
    ArgumentTypeChanged,
    EnumValueAdded,
    EnumValueRemoved,
    UnionMemberAdded,
    UnionMemberRemoved,
    InterfaceAdded,
    InterfaceRemoved,
}

/// One structurally detected difference between two schema revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub criticality: Criticality,
    pub kind: ChangeKind,
    /// Dotted coordinate of the affected element, e.g. `Query.user.id`.
    pub path: String,
    /// Human readable description, names quoted with single quotes.
    pub message: String,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Loads file contents at a given revision.
#[async_trait]
pub trait FileLoader: Send + Sync {
    /// Returns the text of the file the pointer identifies.
    async fn load_file(&self, pointer: &SchemaPointer) -> Result<String>;
}

/// Loads the repository's notification configuration.
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// Returns `Ok(None)` when the repository has no configuration.
    async fn load_config(&self) -> Result<Option<RawConfig>>;
}

/// Builds schema representations from source text and diffs them.
pub trait SchemaEngine: Send + Sync {
    /// The in-memory schema representation this engine works on.
    type Schema: Send + Sync;

    /// Parses schema text into a representation. Only syntax is checked.
    fn build(&self, source: &str) -> Result<Self::Schema>;

    /// Compares two built schemas.
    ///
    /// Returns an empty list when there is no semantic difference.
    fn diff(&self, old: &Self::Schema, new: &Self::Schema) -> Vec<Change>;
}

/// Delivers a notification payload to one channel's target.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends the payload to the given target URL.
    async fn send(&self, target: &str, payload: &crate::dispatch::NotificationPayload) -> Result<()>;
}
