//! Integration test for delivery failure handling over real HTTP.

use anyhow::Result;
use schemawatch::config::HttpConfig;
use schemawatch::dispatch::DeliveryError;
use schemawatch::graphql::GraphQlEngine;
use schemawatch::notification::default_registry;
use schemawatch::{handle_schema_change_notifications, Outcome, PipelineDeps, PushContext};
use std::sync::Mutex;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod helpers;
use helpers::{
    fake_loaders::{FakeConfigLoader, FakeFileLoader},
    push_event, BEFORE, SCHEMA_V1, SCHEMA_V2,
};

#[tokio::test]
async fn test_channel_failure_does_not_block_other_channels() -> Result<()> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slack"))
        .respond_with(ResponseTemplate::new(500).set_body_string("invalid_token"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/discord"))
        .and(body_partial_json(serde_json::json!({ "username": "SchemaWatch" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(serde_json::json!({
            "environment": "default",
            "repo": "api",
            "owner": "acme",
            "commit": "bbbbbbb",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = FakeConfigLoader::yaml(&format!(
        "branch: main\nschema: schema.graphql\nnotifications:\n  slack: {0}/slack\n  discord: {0}/discord\n  webhook: {0}/hook\n",
        server.uri()
    ));
    let files = FakeFileLoader::new()
        .with_file(BEFORE, SCHEMA_V1)
        .with_file("refs/heads/main", SCHEMA_V2);
    let channels = default_registry(&HttpConfig::default())?;

    let failures = Mutex::new(Vec::new());
    let on_error = |error: &DeliveryError| {
        failures
            .lock()
            .unwrap()
            .push(format!("{:#}", error.source));
    };
    let ctx = PushContext::from_event(push_event("refs/heads/main"), "test", "push");

    let outcome = handle_schema_change_notifications(
        &ctx,
        PipelineDeps {
            files: &files,
            config: &config,
            engine: &GraphQlEngine,
            channels: &channels,
            on_error: &on_error,
        },
    )
    .await?;

    let Outcome::Dispatched { report, .. } = outcome else {
        panic!("expected a dispatch, got {:?}", outcome);
    };
    assert_eq!(report.failed, vec!["slack"]);
    assert_eq!(report.delivered, vec!["discord", "webhook"]);

    let failures = failures.into_inner().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("500"), "unexpected error: {}", failures[0]);
    assert!(failures[0].contains("invalid_token"));

    // Expectations on the mocks are verified when the server drops.
    Ok(())
}
