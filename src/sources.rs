//! Resolution of the two schema revisions compared by the pipeline.

use crate::core::{FileLoader, SchemaEngine, SchemaPointer};
use thiserror::Error;
use tracing::debug;

/// Errors that make a schema revision unusable. Always fatal.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to load schema {pointer}")]
    Load {
        pointer: SchemaPointer,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to build schema {pointer}")]
    Build {
        pointer: SchemaPointer,
        #[source]
        source: anyhow::Error,
    },
}

/// The old and new pointers of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaPointers {
    pub old: SchemaPointer,
    pub new: SchemaPointer,
}

impl SchemaPointers {
    /// `old` points at `before`, `new` at the pushed ref.
    pub fn new(schema_path: &str, before: &str, git_ref: &str) -> Self {
        Self {
            old: SchemaPointer {
                path: schema_path.to_string(),
                git_ref: before.to_string(),
            },
            new: SchemaPointer {
                path: schema_path.to_string(),
                git_ref: git_ref.to_string(),
            },
        }
    }
}

/// Schema text at both revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
    pub old: String,
    pub new: String,
}

/// Built schema representations at both revisions.
pub struct Schemas<S> {
    pub old: S,
    pub new: S,
}

/// Loads both revisions concurrently.
pub async fn load_sources(
    pointers: &SchemaPointers,
    loader: &dyn FileLoader,
) -> Result<Sources, SourceError> {
    let load = |pointer: &SchemaPointer| {
        let pointer = pointer.clone();
        async move {
            loader
                .load_file(&pointer)
                .await
                .map_err(|source| SourceError::Load { pointer, source })
        }
    };

    let (old, new) = futures::try_join!(load(&pointers.old), load(&pointers.new))?;
    debug!(old = %pointers.old, new = %pointers.new, "Loaded schema sources");
    Ok(Sources { old, new })
}

/// Builds both revisions without re-validating them.
pub fn build_schemas<E: SchemaEngine>(
    engine: &E,
    pointers: &SchemaPointers,
    sources: &Sources,
) -> Result<Schemas<E::Schema>, SourceError> {
    let build = |pointer: &SchemaPointer, text: &str| {
        engine.build(text).map_err(|source| SourceError::Build {
            pointer: pointer.clone(),
            source,
        })
    };

    Ok(Schemas {
        old: build(&pointers.old, &sources.old)?,
        new: build(&pointers.new, &sources.new)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::GraphQlEngine;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapLoader(HashMap<String, String>);

    #[async_trait]
    impl FileLoader for MapLoader {
        async fn load_file(&self, pointer: &SchemaPointer) -> anyhow::Result<String> {
            self.0
                .get(&pointer.git_ref)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no file at {}", pointer))
        }
    }

    #[test]
    fn test_pointers_use_before_and_ref() {
        let pointers = SchemaPointers::new("schema.graphql", "abc", "refs/heads/main");
        assert_eq!(pointers.old.git_ref, "abc");
        assert_eq!(pointers.new.git_ref, "refs/heads/main");
        assert_eq!(pointers.old.path, pointers.new.path);
    }

    #[tokio::test]
    async fn test_load_sources() {
        let loader = MapLoader(HashMap::from([
            ("a".to_string(), "type Query { a: String }".to_string()),
            ("b".to_string(), "type Query { b: String }".to_string()),
        ]));
        let pointers = SchemaPointers::new("schema.graphql", "a", "b");

        let sources = load_sources(&pointers, &loader).await.unwrap();

        assert_eq!(sources.old, "type Query { a: String }");
        assert_eq!(sources.new, "type Query { b: String }");
    }

    #[tokio::test]
    async fn test_load_failure_names_pointer() {
        let loader = MapLoader(HashMap::from([(
            "a".to_string(),
            "type Query { a: String }".to_string(),
        )]));
        let pointers = SchemaPointers::new("schema.graphql", "a", "missing");

        let err = load_sources(&pointers, &loader).await.unwrap_err();

        match err {
            SourceError::Load { pointer, .. } => assert_eq!(pointer.git_ref, "missing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_failure_is_reported() {
        let pointers = SchemaPointers::new("schema.graphql", "a", "b");
        let sources = Sources {
            old: "type Query { a: String }".to_string(),
            new: "type Query {".to_string(),
        };

        let result = build_schemas(&GraphQlEngine, &pointers, &sources);

        assert!(matches!(result, Err(SourceError::Build { .. })));
    }
}
