//! Loaders backed by a local git checkout.

use crate::core::{ConfigLoader, FileLoader, SchemaPointer};
use crate::environment::RawConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Reads files at a revision with `git show <rev>:<path>`.
#[derive(Debug, Clone)]
pub struct GitFileLoader {
    repo_path: PathBuf,
}

impl GitFileLoader {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }
}

#[async_trait]
impl FileLoader for GitFileLoader {
    async fn load_file(&self, pointer: &SchemaPointer) -> Result<String> {
        debug!(%pointer, repo = %self.repo_path.display(), "Reading file from git");
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_path)
            .arg("show")
            .arg(format!("{}:{}", pointer.git_ref, pointer.path))
            .output()
            .await
            .context("failed to run git")?;

        if !output.status.success() {
            anyhow::bail!(
                "git show {} failed: {}",
                pointer,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        String::from_utf8(output.stdout).with_context(|| format!("{} is not valid UTF-8", pointer))
    }
}

/// Reads the YAML notification config from the repository at a revision.
pub struct RepoConfigLoader {
    files: Arc<dyn FileLoader>,
    pointer: SchemaPointer,
}

impl RepoConfigLoader {
    pub fn new(files: Arc<dyn FileLoader>, pointer: SchemaPointer) -> Self {
        Self { files, pointer }
    }
}

#[async_trait]
impl ConfigLoader for RepoConfigLoader {
    async fn load_config(&self) -> Result<Option<RawConfig>> {
        let text = self.files.load_file(&self.pointer).await?;
        parse_config(&text).with_context(|| format!("invalid config file {}", self.pointer))
    }
}

/// Parses a YAML config. An empty document means no config.
pub fn parse_config(text: &str) -> Result<Option<RawConfig>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_yml::from_str(text)?))
}
