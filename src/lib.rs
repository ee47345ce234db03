/// SchemaWatch - GraphQL schema change notifications for push events
///
/// This library reacts to a push event, compares the tracked schema before and
/// after the push, and notifies every configured chat or webhook channel about
/// the structural changes it finds.
pub mod notification;

pub mod cli;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod environment;
pub mod formatting;
pub mod gate;
pub mod graphql;
pub mod loaders;
pub mod pipeline;
pub mod sources;

// Re-export core types for convenience
pub use crate::core::*;
pub use pipeline::{handle_schema_change_notifications, Outcome, PipelineDeps, PipelineError, PushContext};
