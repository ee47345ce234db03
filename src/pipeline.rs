//! The schema change notification pipeline.
//!
//! One call handles one push event, moving linearly through the gate, config
//! resolution, source resolution and diffing before fanning out to the
//! delivery channels:
//!
//! `START -> GATED -> SOURCES_RESOLVED -> DIFFED -> DISPATCHED -> DONE`
//!
//! A gate rejection or an empty diff ends the invocation early with a benign
//! [`Outcome`]. Config and source failures are returned as [`PipelineError`].
//! Delivery failures never fail the invocation.

use crate::core::{ConfigLoader, FileLoader, PushEvent, SchemaEngine};
use crate::dispatch::{self, ChannelRegistry, DispatchReport, ErrorHandler, NotificationPayload};
use crate::environment::{self, ConfigError};
use crate::gate::{self, SkipReason};
use crate::sources::{build_schemas, load_sources, SchemaPointers, SourceError};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Errors that fail an invocation. Never raised for benign skips.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid notification config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// How an invocation that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A gate check stopped the pipeline.
    Skipped(SkipReason),
    /// The schema did not change structurally.
    Unchanged,
    /// Changes were found and every active channel has settled.
    Dispatched { changes: usize, report: DispatchReport },
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Skipped(_) => "skipped",
            Outcome::Unchanged => "unchanged",
            Outcome::Dispatched { .. } => "dispatched",
        }
    }
}

/// The triggering push and the labels used for logging.
#[derive(Debug, Clone)]
pub struct PushContext {
    pub event: PushEvent,
    pub owner: String,
    pub repo: String,
    pub git_ref: String,
    pub before: String,
    pub release: String,
    pub action: String,
}

impl PushContext {
    /// Takes owner, repo, ref and `before` from the event itself.
    pub fn from_event(event: PushEvent, release: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            owner: event
                .repository
                .owner
                .display_name()
                .unwrap_or_default()
                .to_string(),
            repo: event.repository.name.clone(),
            git_ref: event.git_ref.clone(),
            before: event.before.clone(),
            event,
            release: release.into(),
            action: action.into(),
        }
    }

    fn id(&self) -> String {
        format!("{}/{}#{}", self.owner, self.repo, self.git_ref)
    }
}

/// The collaborators one invocation works with.
pub struct PipelineDeps<'a, E: SchemaEngine> {
    pub files: &'a dyn FileLoader,
    pub config: &'a dyn ConfigLoader,
    pub engine: &'a E,
    pub channels: &'a ChannelRegistry,
    pub on_error: &'a dyn ErrorHandler,
}

/// Handles one push event end to end.
#[instrument(
    name = "notifications",
    skip_all,
    fields(id = %ctx.id(), release = %ctx.release, action = %ctx.action)
)]
pub async fn handle_schema_change_notifications<E: SchemaEngine>(
    ctx: &PushContext,
    deps: PipelineDeps<'_, E>,
) -> Result<Outcome, PipelineError> {
    info!("started");

    let result = run(ctx, &deps).await;

    let label = match &result {
        Ok(outcome) => outcome.label(),
        Err(_) => "failed",
    };
    metrics::counter!("schemawatch_invocations_total", "outcome" => label).increment(1);

    result
}

async fn run<E: SchemaEngine>(
    ctx: &PushContext,
    deps: &PipelineDeps<'_, E>,
) -> Result<Outcome, PipelineError> {
    let branch = match gate::check_branch_push(&ctx.git_ref) {
        Ok(branch) => branch,
        Err(reason) => {
            warn!(%reason, "Received push event is not a branch push event");
            return Ok(Outcome::Skipped(reason));
        }
    };

    let raw_config = match deps.config.load_config().await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            warn!("Missing config file");
            return Ok(Outcome::Skipped(SkipReason::MissingConfig));
        }
        Err(e) => {
            warn!(error = ?e, "Unreadable config file");
            return Ok(Outcome::Skipped(SkipReason::MissingConfig));
        }
    };

    let config = environment::resolve(&raw_config, branch);

    let notifications = match gate::check_environment(&config, branch) {
        Ok(notifications) => notifications,
        Err(reason) => {
            info!(%reason, "Skipping...");
            return Ok(Outcome::Skipped(reason));
        }
    };
    info!(environment = %config.name, "enabled");

    let schema = config.schema_path()?;
    let pointers = SchemaPointers::new(schema, &ctx.before, &ctx.git_ref);
    let sources = load_sources(&pointers, deps.files).await.inspect_err(|e| {
        error!(error = %e, "Could not load schema sources");
    })?;
    let schemas = build_schemas(deps.engine, &pointers, &sources)?;
    info!("built schemas");

    let changes = deps.engine.diff(&schemas.old, &schemas.new);
    if changes.is_empty() {
        info!("schemas are equal. Skipping...");
        return Ok(Outcome::Unchanged);
    }
    metrics::histogram!("schemawatch_changes_detected").record(changes.len() as f64);
    info!(changes = changes.len(), "schema changes detected");

    let payload = NotificationPayload {
        changes,
        environment: config.name.clone(),
        repo: ctx.repo.clone(),
        owner: ctx.owner.clone(),
        commit: ctx.event.head_commit_id().map(str::to_string),
    };

    let tasks = dispatch::plan(deps.channels, notifications, &payload);
    let report = dispatch::dispatch(tasks, deps.on_error).await;
    info!(
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "notifications dispatched"
    );

    Ok(Outcome::Dispatched {
        changes: payload.changes.len(),
        report,
    })
}
