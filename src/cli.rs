//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `schemawatch.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Notifies chat channels when a pushed commit changes a GraphQL schema.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the push event JSON payload.
    #[arg(short, long, value_name = "FILE", env = "GITHUB_EVENT_PATH")]
    pub event: Option<PathBuf>,

    /// Path to the TOML settings file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the local git checkout of the repository.
    #[arg(long, value_name = "DIR")]
    pub repo_path: Option<PathBuf>,

    /// Path of the notification config file inside the repository.
    #[arg(long, value_name = "PATH")]
    pub config_path: Option<String>,

    /// The logging level (e.g. "info", "debug").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Timeout for each webhook request in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(path) = &self.repo_path {
            dict.insert(
                "repo_path".into(),
                Value::from(path.to_string_lossy().into_owned()),
            );
        }

        if let Some(path) = &self.config_path {
            dict.insert("config_path".into(), Value::from(path.clone()));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if let Some(timeout) = self.timeout {
            let mut http = Dict::new();
            http.insert("timeout_seconds".into(), Value::from(timeout));
            dict.insert("http".into(), Value::Dict(Tag::Default, http));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
