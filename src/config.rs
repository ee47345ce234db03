//! Configuration management for SchemaWatch
//!
//! This module defines the application settings of the `schemawatch` binary.
//! It uses the `figment` crate to layer defaults, a `schemawatch.toml` file,
//! environment variables and command-line arguments.
//!
//! These settings are distinct from the per-repository notification config
//! (see [`crate::environment`]), which is read from the repository itself.

use crate::cli::Cli;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the settings file.
pub const DEFAULT_CONFIG_FILE: &str = "schemawatch.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Path to the local git checkout of the repository.
    pub repo_path: PathBuf,
    /// Path of the notification config file inside the repository.
    pub config_path: String,
    /// Release label attached to log output.
    pub release: String,
    /// Settings for outgoing webhook requests.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Settings for outgoing webhook requests.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// User-Agent header sent with each request.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: format!("schemawatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Loads the application configuration.
    ///
    /// Sources are layered, later ones winning: built-in defaults, the TOML
    /// file (`--config` or `schemawatch.toml`), `SCHEMAWATCH_` environment
    /// variables (nested keys separated by `__`), then CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_file = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            // e.g. SCHEMAWATCH_HTTP__TIMEOUT_SECONDS=30
            .merge(Env::prefixed("SCHEMAWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            repo_path: PathBuf::from("."),
            config_path: ".github/graphql-inspector.yaml".to_string(),
            release: env!("CARGO_PKG_VERSION").to_string(),
            http: HttpConfig::default(),
        }
    }
}
