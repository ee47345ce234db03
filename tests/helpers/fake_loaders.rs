//! In-memory loaders for driving the pipeline without git.

use async_trait::async_trait;
use schemawatch::environment::RawConfig;
use schemawatch::{ConfigLoader, FileLoader, SchemaPointer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves file contents keyed by revision and counts loads.
#[derive(Debug, Default)]
pub struct FakeFileLoader {
    files: HashMap<String, String>,
    pub loads: AtomicUsize,
    pub requested: Mutex<Vec<SchemaPointer>>,
}

impl FakeFileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, git_ref: &str, contents: &str) -> Self {
        self.files.insert(git_ref.to_string(), contents.to_string());
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileLoader for FakeFileLoader {
    async fn load_file(&self, pointer: &SchemaPointer) -> anyhow::Result<String> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(pointer.clone());
        self.files
            .get(&pointer.git_ref)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no file at {}", pointer))
    }
}

/// Returns a fixed config, no config, or an error.
#[derive(Debug)]
pub struct FakeConfigLoader {
    config: Option<String>,
    fail: bool,
    pub loads: AtomicUsize,
}

impl FakeConfigLoader {
    /// A loader serving the given YAML.
    pub fn yaml(yaml: &str) -> Self {
        Self {
            config: Some(yaml.to_string()),
            fail: false,
            loads: AtomicUsize::new(0),
        }
    }

    /// A loader for a repository without config.
    pub fn missing() -> Self {
        Self {
            config: None,
            fail: false,
            loads: AtomicUsize::new(0),
        }
    }

    /// A loader whose fetch fails.
    pub fn failing() -> Self {
        Self {
            config: None,
            fail: true,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigLoader for FakeConfigLoader {
    async fn load_config(&self) -> anyhow::Result<Option<RawConfig>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("config fetch failed");
        }
        match &self.config {
            Some(yaml) => Ok(Some(serde_yml::from_str(yaml)?)),
            None => Ok(None),
        }
    }
}
