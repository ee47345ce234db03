//! Resolution of the repository's notification configuration.
//!
//! The raw configuration describes a default environment at the top level and
//! any number of named environments under `env`. Resolving it against the
//! pushed branch selects exactly one environment and normalizes it into a
//! [`NormalizedConfig`], which is never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Name given to the environment described by the top-level keys.
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// Configuration as read from the repository, before normalization.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct RawConfig {
    #[serde(flatten)]
    pub defaults: RawEnvironment,
    /// Named environments that override the top-level defaults.
    #[serde(default)]
    pub env: BTreeMap<String, RawEnvironment>,
}

/// One environment definition. Absent keys inherit from the defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct RawEnvironment {
    #[serde(default)]
    pub branch: Option<String>,
    /// Either a path, or the legacy `<branch>:<path>` pointer.
    #[serde(default)]
    pub schema: Option<String>,
    /// An object of channel targets, or `false` to disable notifications.
    #[serde(default)]
    pub notifications: Option<Value>,
}

impl RawEnvironment {
    /// The branch this definition applies to, honouring the legacy pointer.
    fn branch(&self) -> Option<&str> {
        self.branch
            .as_deref()
            .or_else(|| self.legacy_pointer().map(|(branch, _)| branch))
    }

    fn schema_path(&self) -> Option<&str> {
        match self.legacy_pointer() {
            Some((_, path)) => Some(path),
            None => self.schema.as_deref(),
        }
    }

    fn legacy_pointer(&self) -> Option<(&str, &str)> {
        if self.branch.is_some() {
            return None;
        }
        let (branch, path) = self.schema.as_deref()?.split_once(':')?;
        if branch.is_empty() || path.is_empty() {
            return None;
        }
        Some((branch, path))
    }
}

/// Errors raised when a configuration exists but cannot be used.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("environment '{environment}' does not define a schema path")]
    MissingSchema { environment: String },
}

/// Active delivery targets, keyed by channel id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notifications(BTreeMap<String, String>);

impl Notifications {
    /// Keeps only channels with a non-empty string target.
    pub fn from_value(value: &serde_json::Map<String, Value>) -> Self {
        let targets = value
            .iter()
            .filter_map(|(channel, target)| match target {
                Value::String(url) if !url.trim().is_empty() => {
                    Some((channel.clone(), url.trim().to_string()))
                }
                _ => None,
            })
            .collect();
        Self(targets)
    }

    /// The target URL of a channel, if that channel is active.
    pub fn target(&self, channel: &str) -> Option<&str> {
        self.0.get(channel).map(String::as_str)
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Notifications {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .filter(|(_, v)| !v.is_empty())
                .collect(),
        )
    }
}

/// Whether notifications are turned on for an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationsConfig {
    Disabled,
    Enabled(Notifications),
}

impl NotificationsConfig {
    fn from_raw(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => NotificationsConfig::Enabled(Notifications::from_value(map)),
            _ => NotificationsConfig::Disabled,
        }
    }
}

/// The settings of the one environment selected for this push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedConfig {
    pub branch: String,
    pub schema: Option<String>,
    pub notifications: NotificationsConfig,
    pub name: String,
}

impl NormalizedConfig {
    /// The schema path to diff. Only required once the gate has accepted the push.
    pub fn schema_path(&self) -> Result<&str, ConfigError> {
        self.schema
            .as_deref()
            .ok_or_else(|| ConfigError::MissingSchema {
                environment: self.name.clone(),
            })
    }
}

/// Selects and normalizes the environment that applies to `branch`.
///
/// A named environment whose branch equals `branch` wins. Otherwise the
/// top-level defaults are used as the `default` environment, carrying their
/// own branch so that a mismatch is caught by the gate.
pub fn resolve(raw: &RawConfig, branch: &str) -> NormalizedConfig {
    let defaults = &raw.defaults;

    let selected = raw.env.iter().find(|(_, env)| {
        env.branch().or_else(|| defaults.branch()) == Some(branch)
    });

    let (name, env) = match selected {
        Some((name, env)) => (name.as_str(), Some(env)),
        None => (DEFAULT_ENVIRONMENT, None),
    };

    let pick_branch = env.and_then(RawEnvironment::branch).or_else(|| defaults.branch());
    let pick_schema = env
        .and_then(RawEnvironment::schema_path)
        .or_else(|| defaults.schema_path());
    let pick_notifications = env
        .and_then(|env| env.notifications.as_ref())
        .or(defaults.notifications.as_ref());

    NormalizedConfig {
        branch: pick_branch.unwrap_or_default().to_string(),
        schema: pick_schema.map(str::to_string),
        notifications: NotificationsConfig::from_raw(pick_notifications),
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> RawConfig {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_resolves_top_level_environment() {
        let raw = parse(
            r#"
branch: main
schema: schema.graphql
notifications:
  slack: https://hooks.slack.com/services/x
"#,
        );

        let config = resolve(&raw, "main");

        assert_eq!(config.name, DEFAULT_ENVIRONMENT);
        assert_eq!(config.branch, "main");
        assert_eq!(config.schema_path(), Ok("schema.graphql"));
        let expected: Notifications = [("slack", "https://hooks.slack.com/services/x")]
            .into_iter()
            .collect();
        assert_eq!(config.notifications, NotificationsConfig::Enabled(expected));
    }

    #[test]
    fn test_named_environment_inherits_defaults() {
        let raw = parse(
            r#"
branch: main
schema: schema.graphql
notifications:
  discord: https://discord.com/api/webhooks/1
env:
  production:
    branch: main
  staging:
    branch: develop
    schema: staging.graphql
"#,
        );

        let production = resolve(&raw, "main");
        assert_eq!(production.name, "production");
        assert_eq!(production.schema_path(), Ok("schema.graphql"));
        assert!(matches!(production.notifications, NotificationsConfig::Enabled(_)));

        let staging = resolve(&raw, "develop");
        assert_eq!(staging.name, "staging");
        assert_eq!(staging.branch, "develop");
        assert_eq!(staging.schema_path(), Ok("staging.graphql"));
    }

    #[test]
    fn test_unmatched_branch_keeps_default_branch() {
        let raw = parse(
            r#"
branch: main
schema: schema.graphql
notifications:
  slack: https://hooks.slack.com/services/x
env:
  staging:
    branch: develop
"#,
        );

        let config = resolve(&raw, "feature/foo");

        assert_eq!(config.name, DEFAULT_ENVIRONMENT);
        assert_eq!(config.branch, "main");
    }

    #[test]
    fn test_notifications_false_disables() {
        let raw = parse(
            r#"
branch: main
schema: schema.graphql
notifications:
  slack: https://hooks.slack.com/services/x
env:
  staging:
    branch: develop
    notifications: false
"#,
        );

        let config = resolve(&raw, "develop");

        assert_eq!(config.notifications, NotificationsConfig::Disabled);
    }

    #[test]
    fn test_missing_notifications_is_disabled() {
        let raw = parse("branch: main\nschema: schema.graphql\n");
        let config = resolve(&raw, "main");
        assert_eq!(config.notifications, NotificationsConfig::Disabled);
    }

    #[test]
    fn test_empty_targets_are_dropped() {
        let raw = parse(
            r#"
branch: main
schema: schema.graphql
notifications:
  slack: ""
  discord: null
  webhook: https://example.com/hook
"#,
        );

        let config = resolve(&raw, "main");

        let NotificationsConfig::Enabled(notifications) = config.notifications else {
            panic!("expected notifications to be enabled");
        };
        assert_eq!(notifications.channels().collect::<Vec<_>>(), vec!["webhook"]);
        assert_eq!(notifications.target("slack"), None);
    }

    #[test]
    fn test_legacy_schema_pointer() {
        let raw = parse(
            r#"
schema: master:api/schema.graphql
notifications:
  slack: https://hooks.slack.com/services/x
"#,
        );

        let config = resolve(&raw, "master");

        assert_eq!(config.branch, "master");
        assert_eq!(config.schema_path(), Ok("api/schema.graphql"));
    }

    #[test]
    fn test_missing_schema_resolves_and_errors_on_use() {
        let raw = parse("branch: main\nnotifications: false\n");
        let config = resolve(&raw, "main");
        assert_eq!(config.schema, None);
        assert_eq!(config.notifications, NotificationsConfig::Disabled);
        assert_eq!(
            config.schema_path(),
            Err(ConfigError::MissingSchema {
                environment: DEFAULT_ENVIRONMENT.to_string()
            })
        );
    }

    #[test]
    fn test_schemas_only_under_env() {
        let raw = parse(
            r#"
env:
  staging:
    branch: develop
    schema: schema.graphql
    notifications:
      slack: u1
"#,
        );

        let unmatched = resolve(&raw, "feature/x");
        assert_eq!(unmatched.name, DEFAULT_ENVIRONMENT);
        assert_eq!(unmatched.branch, "");
        assert_eq!(unmatched.schema, None);

        let staging = resolve(&raw, "develop");
        assert_eq!(staging.schema_path(), Ok("schema.graphql"));
    }
}
