//! SchemaWatch - GraphQL schema change notifier
//!
//! Reads a push event payload, compares the tracked schema in the local git
//! checkout before and after the push, and notifies the configured channels.

use anyhow::{Context, Result};
use clap::Parser;
use schemawatch::{
    cli::Cli,
    config::Config,
    dispatch::DeliveryError,
    graphql::GraphQlEngine,
    handle_schema_change_notifications,
    loaders::{GitFileLoader, RepoConfigLoader},
    notification::default_registry,
    FileLoader, Outcome, PipelineDeps, PushContext, PushEvent, SchemaPointer,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).context("failed to load configuration")?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("SchemaWatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Repository: {}", config.repo_path.display());
    info!("Config Path: {}", config.config_path);
    info!("HTTP Timeout: {}s", config.http.timeout_seconds);
    info!("-------------------------------------------------------");

    let event_path = cli
        .event
        .clone()
        .context("no push event given (use --event or GITHUB_EVENT_PATH)")?;
    let event_json = tokio::fs::read_to_string(&event_path)
        .await
        .with_context(|| format!("failed to read push event {}", event_path.display()))?;
    let event: PushEvent =
        serde_json::from_str(&event_json).context("failed to parse push event")?;

    let ctx = PushContext::from_event(event, config.release.clone(), "push");

    let files: Arc<dyn FileLoader> = Arc::new(GitFileLoader::new(&config.repo_path));
    let config_loader = RepoConfigLoader::new(
        files.clone(),
        SchemaPointer {
            path: config.config_path.clone(),
            git_ref: ctx.git_ref.clone(),
        },
    );
    let channels = default_registry(&config.http)?;

    let failures = AtomicUsize::new(0);
    let on_error = |_: &DeliveryError| {
        failures.fetch_add(1, Ordering::SeqCst);
    };

    let outcome = handle_schema_change_notifications(
        &ctx,
        PipelineDeps {
            files: files.as_ref(),
            config: &config_loader,
            engine: &GraphQlEngine,
            channels: &channels,
            on_error: &on_error,
        },
    )
    .await
    .inspect_err(|e| error!(error = ?e, "Schema change notification failed"))?;

    match outcome {
        Outcome::Skipped(reason) => info!(%reason, "Nothing to do"),
        Outcome::Unchanged => info!("Schema unchanged"),
        Outcome::Dispatched { changes, report } => info!(
            changes,
            delivered = ?report.delivered,
            failed = ?report.failed,
            reported_failures = failures.load(Ordering::SeqCst),
            "Finished"
        ),
    }

    Ok(())
}
