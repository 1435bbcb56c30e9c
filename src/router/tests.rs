use std::sync::{Arc, Mutex};

use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;

use super::*;
use crate::codepipeline::{CodePipelineClient, MetadataFetcher};
use crate::config::{Config, WebhookConfig};
use crate::error::NotifierError;

const WEBHOOK_PATH: &str = "/services/T000/B000/XXX";

fn stage_event(stage: &str, state: &str) -> String {
    json!({
        "detail-type": "CodePipeline Stage Execution State Change",
        "source": "aws.codepipeline",
        "time": "2017-04-22T03:31:47Z",
        "detail": {
            "pipeline": "app",
            "execution-id": "exec-1",
            "stage": stage,
            "state": state
        }
    })
    .to_string()
}

fn pipeline_event(state: &str) -> String {
    json!({
        "detail-type": "CodePipeline Pipeline Execution State Change",
        "time": "2017-04-22T03:31:47Z",
        "detail": {"pipeline": "app", "execution-id": "exec-1", "state": state}
    })
    .to_string()
}

fn router_for(codepipeline: &ServerGuard, webhook: &ServerGuard, routing: RoutingConfig) -> EventRouter {
    let mut config = Config::default();
    config.codepipeline.endpoint = Some(format!("{}/", codepipeline.url()));
    config.routing = routing;

    let client = CodePipelineClient::new(&config, None).unwrap();
    let formatter = MessageFormatter::new(MetadataFetcher::new(client), &config.codepipeline.region);
    let dispatcher = WebhookDispatcher::new(&WebhookConfig {
        url: Some(format!("{}{WEBHOOK_PATH}", webhook.url())),
        ..Default::default()
    })
    .unwrap();

    EventRouter::new(formatter, dispatcher, config.routing)
}

async fn mock_get_pipeline(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/")
        .match_header("x-amz-target", "CodePipeline_20150709.GetPipeline")
        .with_status(200)
        .with_body(
            json!({"pipeline": {"name": "app", "stages": [
                {"name": "source"}, {"name": "build"}, {"name": "deploy"}
            ]}})
            .to_string(),
        )
        .create_async()
        .await
}

async fn mock_get_execution(server: &mut ServerGuard, revisions: serde_json::Value) -> Mock {
    server
        .mock("POST", "/")
        .match_header("x-amz-target", "CodePipeline_20150709.GetPipelineExecution")
        .with_status(200)
        .with_body(
            json!({"pipelineExecution": {
                "pipelineName": "app",
                "pipelineExecutionId": "exec-1",
                "artifactRevisions": revisions
            }})
            .to_string(),
        )
        .create_async()
        .await
}

fn one_revision() -> serde_json::Value {
    json!([{
        "name": "app",
        "revisionId": "abcdef1234567890",
        "revisionSummary": "fix bug",
        "revisionUrl": "http://x/1"
    }])
}

async fn mock_webhook(server: &mut ServerGuard, body: &str, status: usize) -> Mock {
    server
        .mock("POST", WEBHOOK_PATH)
        .match_header("content-type", "application/json")
        .match_body(Matcher::Regex(regex_escape(body)))
        .with_status(status)
        .create_async()
        .await
}

/// Like [`mock_webhook`], appending `label` to `delivered` when the mock is hit.
async fn mock_webhook_in_order(
    server: &mut ServerGuard,
    body: &str,
    label: &'static str,
    delivered: &Arc<Mutex<Vec<&'static str>>>,
) -> Mock {
    let delivered = Arc::clone(delivered);
    server
        .mock("POST", WEBHOOK_PATH)
        .match_body(Matcher::Regex(regex_escape(body)))
        .with_status(200)
        .with_body_from_request(move |_| {
            delivered.lock().unwrap().push(label);
            Vec::new()
        })
        .create_async()
        .await
}

fn regex_escape(text: &str) -> String {
    text.chars()
        .flat_map(|c| {
            let escape = "\\.+*?()|[]{}^$".contains(c).then_some('\\');
            escape.into_iter().chain(std::iter::once(c))
        })
        .collect()
}

async fn mock_no_calls(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await
}

#[tokio::test]
async fn test_stage_event_posts_stage_notification() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let get_pipeline = mock_get_pipeline(&mut codepipeline).await;
    let stage_post = mock_webhook(
        &mut webhook,
        "Pipeline: App, Stage: deploy (3/3), State: Succeeded",
        200,
    )
    .await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let outcome = router
        .handle_json(&stage_event("deploy", "SUCCEEDED"))
        .await
        .unwrap();

    get_pipeline.assert_async().await;
    stage_post.assert_async().await;
    assert_eq!(outcome, Outcome::Posted(Ack));
    assert_eq!(outcome.to_string(), "posted to slack");
}

#[tokio::test]
async fn test_build_stage_posts_metadata_then_stage() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let get_execution = mock_get_execution(&mut codepipeline, one_revision()).await;
    let get_pipeline = mock_get_pipeline(&mut codepipeline).await;
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let build_post = mock_webhook_in_order(
        &mut webhook,
        "Building and deploying: <http://x/1|app@abcdef1>",
        "build metadata",
        &delivered,
    )
    .await;
    let stage_post = mock_webhook_in_order(
        &mut webhook,
        "Pipeline: App, Stage: build (2/3), State: Started",
        "stage",
        &delivered,
    )
    .await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let outcome = router
        .handle_json(&stage_event("build", "STARTED"))
        .await
        .unwrap();

    get_execution.assert_async().await;
    get_pipeline.assert_async().await;
    build_post.assert_async().await;
    stage_post.assert_async().await;
    assert_eq!(*delivered.lock().unwrap(), vec!["build metadata", "stage"]);
    assert_eq!(outcome, Outcome::Posted(Ack));
}

#[tokio::test]
async fn test_failed_build_metadata_post_does_not_abort_stage_post() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let _execution = mock_get_execution(&mut codepipeline, one_revision()).await;
    let _pipeline = mock_get_pipeline(&mut codepipeline).await;
    let build_post = mock_webhook(&mut webhook, "Building and deploying", 500).await;
    let stage_post = mock_webhook(&mut webhook, "Stage: build (2/3)", 200).await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let outcome = router
        .handle_json(&stage_event("build", "FAILED"))
        .await
        .unwrap();

    build_post.assert_async().await;
    stage_post.assert_async().await;
    assert_eq!(outcome, Outcome::Posted(Ack));
}

#[tokio::test]
async fn test_stage_post_failure_decides_outcome() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let _execution = mock_get_execution(&mut codepipeline, one_revision()).await;
    let _pipeline = mock_get_pipeline(&mut codepipeline).await;
    let build_post = mock_webhook(&mut webhook, "Building and deploying", 200).await;
    let stage_post = mock_webhook(&mut webhook, "Stage: build (2/3)", 404).await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let err = router
        .handle_json(&stage_event("build", "SUCCEEDED"))
        .await
        .unwrap_err();

    build_post.assert_async().await;
    stage_post.assert_async().await;
    assert!(matches!(err, NotifierError::DeliveryStatus(404)));
    assert_eq!(err.to_string(), "status code: 404");
}

#[tokio::test]
async fn test_build_without_revision_still_posts_stage() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let _execution = mock_get_execution(&mut codepipeline, json!([])).await;
    let _pipeline = mock_get_pipeline(&mut codepipeline).await;
    let build_post = webhook
        .mock("POST", WEBHOOK_PATH)
        .match_body(Matcher::Regex("Building and deploying".to_string()))
        .expect(0)
        .create_async()
        .await;
    let stage_post = mock_webhook(&mut webhook, "Stage: build (2/3)", 200).await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let outcome = router
        .handle_json(&stage_event("build", "STARTED"))
        .await
        .unwrap();

    build_post.assert_async().await;
    stage_post.assert_async().await;
    assert_eq!(outcome, Outcome::Posted(Ack));
}

#[tokio::test]
async fn test_custom_build_stage_name() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let get_execution = mock_get_execution(&mut codepipeline, one_revision()).await;
    let _pipeline = mock_get_pipeline(&mut codepipeline).await;
    let build_post = mock_webhook(&mut webhook, "Building and deploying", 200).await;
    let stage_post = mock_webhook(&mut webhook, "Stage: deploy (3/3)", 200).await;

    let routing = RoutingConfig {
        build_stage: "deploy".to_string(),
        ..Default::default()
    };
    let router = router_for(&codepipeline, &webhook, routing);
    router
        .handle_json(&stage_event("deploy", "STARTED"))
        .await
        .unwrap();

    get_execution.assert_async().await;
    build_post.assert_async().await;
    stage_post.assert_async().await;
}

#[tokio::test]
async fn test_unknown_stage_fails_without_posting() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let _pipeline = mock_get_pipeline(&mut codepipeline).await;
    let no_posts = mock_no_calls(&mut webhook).await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let err = router
        .handle_json(&stage_event("approve", "STARTED"))
        .await
        .unwrap_err();

    no_posts.assert_async().await;
    assert!(matches!(err, NotifierError::StageNotFound { .. }));
}

#[tokio::test]
async fn test_upstream_failure_aborts_invocation() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let _mock = codepipeline
        .mock("POST", "/")
        .with_status(400)
        .with_body(r#"{"__type": "PipelineNotFoundException", "message": "nope"}"#)
        .create_async()
        .await;
    let no_posts = mock_no_calls(&mut webhook).await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let err = router
        .handle_json(&stage_event("deploy", "FAILED"))
        .await
        .unwrap_err();

    no_posts.assert_async().await;
    assert!(matches!(err, NotifierError::UpstreamQuery { .. }));
    assert!(err.to_string().contains("PipelineNotFoundException"));
}

#[tokio::test]
async fn test_unrecognized_event_is_a_no_op() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let no_queries = mock_no_calls(&mut codepipeline).await;
    let no_posts = mock_no_calls(&mut webhook).await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let event = json!({"detail-type": "EC2 Instance State-change Notification", "detail": {}});
    let outcome = router.handle_json(&event.to_string()).await.unwrap();

    no_queries.assert_async().await;
    no_posts.assert_async().await;
    assert_eq!(
        outcome,
        Outcome::Skipped(DetailType::Other(
            "EC2 Instance State-change Notification".to_string()
        ))
    );
    assert_eq!(
        outcome.to_string(),
        "ignored event type: EC2 Instance State-change Notification"
    );
}

#[tokio::test]
async fn test_action_event_is_a_no_op() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let no_posts = mock_no_calls(&mut webhook).await;
    let _no_queries = mock_no_calls(&mut codepipeline).await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let event = json!({
        "detail-type": "CodePipeline Action Execution State Change",
        "detail": {"pipeline": "app", "execution-id": "exec-1", "stage": "build",
                   "action": "compile", "state": "STARTED"}
    });
    let outcome = router.handle_json(&event.to_string()).await.unwrap();

    no_posts.assert_async().await;
    assert_eq!(outcome, Outcome::Skipped(DetailType::ActionStateChange));
}

#[tokio::test]
async fn test_pipeline_event_is_disabled_by_default() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let no_queries = mock_no_calls(&mut codepipeline).await;
    let no_posts = mock_no_calls(&mut webhook).await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let outcome = router
        .handle_json(&pipeline_event("SUCCEEDED"))
        .await
        .unwrap();

    no_queries.assert_async().await;
    no_posts.assert_async().await;
    assert_eq!(outcome, Outcome::Skipped(DetailType::PipelineStateChange));
    assert_eq!(
        outcome.to_string(),
        "ignored event type: CodePipeline Pipeline Execution State Change"
    );
}

#[tokio::test]
async fn test_pipeline_event_when_enabled() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let _execution = mock_get_execution(&mut codepipeline, one_revision()).await;
    let post = webhook
        .mock("POST", WEBHOOK_PATH)
        .match_body(Matcher::Json(json!({"attachments": [{
            "color": "#67d4e2",
            "title": "Building and deploying: <http://x/1|app@abcdef1>",
            "text": "fix bug",
            "mrkdwn_in": ["text", "title"],
            "ts": "2017-04-22T03:31:47Z",
            "fields": [
                {"title": "Pipeline", "value": "<https://console.aws.amazon.com/codepipeline/home?region=us-east-1#/view/app|app>", "short": true},
                {"title": "Execution Id", "value": "exec-1", "short": true},
                {"title": "State", "value": "Superceded", "short": true}
            ]
        }]})))
        .with_status(200)
        .create_async()
        .await;

    let routing = RoutingConfig {
        pipeline_events: true,
        ..Default::default()
    };
    let router = router_for(&codepipeline, &webhook, routing);
    let outcome = router
        .handle_json(&pipeline_event("SUPERCEDED"))
        .await
        .unwrap();

    post.assert_async().await;
    assert_eq!(outcome, Outcome::Posted(Ack));
}

#[tokio::test]
async fn test_pipeline_event_without_revision_fails() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let _execution = mock_get_execution(&mut codepipeline, json!([])).await;
    let no_posts = mock_no_calls(&mut webhook).await;

    let routing = RoutingConfig {
        pipeline_events: true,
        ..Default::default()
    };
    let router = router_for(&codepipeline, &webhook, routing);
    let err = router
        .handle_json(&pipeline_event("STARTED"))
        .await
        .unwrap_err();

    no_posts.assert_async().await;
    assert!(matches!(err, NotifierError::MissingRevision { .. }));
}

#[tokio::test]
async fn test_stage_event_without_stage_is_invalid() {
    let codepipeline = mockito::Server::new_async().await;
    let webhook = mockito::Server::new_async().await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let event = json!({
        "detail-type": "CodePipeline Stage Execution State Change",
        "detail": {"pipeline": "app", "execution-id": "exec-1", "state": "STARTED"}
    });
    let err = router.handle_json(&event.to_string()).await.unwrap_err();

    assert!(matches!(err, NotifierError::InvalidEvent(_)));
}

#[tokio::test]
async fn test_event_without_detail_type_is_a_no_op() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let no_queries = mock_no_calls(&mut codepipeline).await;
    let no_posts = mock_no_calls(&mut webhook).await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let missing = json!({"source": "aws.codepipeline", "detail": {"pipeline": "app"}});
    let null = json!({"detail-type": null, "detail": {"pipeline": "app"}});

    for event in [missing, null] {
        let outcome = router.handle_json(&event.to_string()).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped(DetailType::Other(String::new())));
        assert_eq!(outcome.to_string(), "ignored event without detail-type");
    }

    no_queries.assert_async().await;
    no_posts.assert_async().await;
}

#[tokio::test]
async fn test_unrelated_event_with_object_time_is_a_no_op() {
    let mut codepipeline = mockito::Server::new_async().await;
    let mut webhook = mockito::Server::new_async().await;
    let no_posts = mock_no_calls(&mut webhook).await;
    let _no_queries = mock_no_calls(&mut codepipeline).await;

    let router = router_for(&codepipeline, &webhook, RoutingConfig::default());
    let event = json!({"detail-type": "EC2 thing", "time": {"nested": 1}});
    let outcome = router.handle_json(&event.to_string()).await.unwrap();

    no_posts.assert_async().await;
    assert_eq!(outcome, Outcome::Skipped(DetailType::Other("EC2 thing".to_string())));
}
