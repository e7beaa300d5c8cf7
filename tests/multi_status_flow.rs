//! Integration tests for batch (multi-status) endpoints using wiremock.
//!
//! - All items accepted: task ids taken from `Operation-Location`
//! - Partial failure: one error per item, in submission order
//! - Single top-level HTTP error reported as a one-element list
//! - Sandbox URL items keep the submitted URL on failure
//! - API key creation and deletion shapes

use serde_json::json;
use tmv1::api_keys::{self, ApiKeyRequest};
use tmv1::client::Tmv1Client;
use tmv1::config::{ClientConfig, ProxySettings};
use tmv1::email::{self, EmailMessageRequest};
use tmv1::endpoints::{self, EndpointRequest};
use tmv1::objects::{self, ObjectRequest, ObjectType};
use tmv1::result::{MultiApiResult, ResultCode};
use tmv1::sandbox;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: creates a client pointed at the given wiremock server.
fn mock_client(server: &MockServer) -> Tmv1Client {
    let config = ClientConfig::new("tests", "mock-token", server.uri())
        .with_proxy(ProxySettings::default());
    Tmv1Client::new(&config).unwrap()
}

fn accepted(task_id: &str) -> serde_json::Value {
    json!({
        "status": 202,
        "headers": [{
            "name": "Operation-Location",
            "value": format!("https://api.xdr.trendmicro.com/v3.0/response/tasks/{task_id}")
        }]
    })
}

// ── Success ────────────────────────────────────────────────────────────

#[tokio::test]
async fn isolate_reports_task_ids() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3.0/response/endpoints/isolate"))
        .and(body_json(json!([
            {"endpointName": "host-1", "description": "contain"},
            {"agentGuid": "guid-2"}
        ])))
        .respond_with(
            ResponseTemplate::new(207).set_body_json(json!([accepted("00000001"), accepted("00000002")])),
        )
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let requests = [
        EndpointRequest::by_name("host-1").with_description("contain"),
        EndpointRequest::by_agent_guid("guid-2"),
    ];
    let result = endpoints::isolate(&client, &requests).await.unwrap();

    assert_eq!(result.result_code(), ResultCode::Success);
    let items = &result.response().unwrap().items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].status, 202);
    assert_eq!(items[0].task_id.as_deref(), Some("00000001"));
    assert_eq!(items[1].task_id.as_deref(), Some("00000002"));
}

#[tokio::test]
async fn block_list_addition() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3.0/response/suspiciousObjects"))
        .and(body_json(json!([{"domain": "evil.example", "description": "c2"}])))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!([accepted("00000010")])))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let request = ObjectRequest::new(ObjectType::Domain, "evil.example").with_description("c2");
    let result = objects::add_block(&client, &[request]).await.unwrap();

    assert_eq!(
        result.into_response().unwrap().items[0].task_id.as_deref(),
        Some("00000010")
    );
}

#[tokio::test]
async fn api_key_creation_returns_secret() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3.0/iam/apiKeys"))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!([{
            "status": 201,
            "body": {
                "id": "d367abdd",
                "value": "eyJ0eXAi",
                "expiredDateTime": "2024-04-12T01:00:00Z"
            }
        }])))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = api_keys::create(&client, &[ApiKeyRequest::new("ci", "Master Administrator")])
        .await
        .unwrap();

    let key = &result.response().unwrap().items[0];
    assert_eq!(key.status, 201);
    assert_eq!(key.id, "d367abdd");
    assert_eq!(key.value, "eyJ0eXAi");
}

#[tokio::test]
async fn api_key_deletion_sends_ids() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3.0/iam/apiKeys/delete"))
        .and(body_json(json!([{"id": "k1"}, {"id": "k2"}])))
        .respond_with(
            ResponseTemplate::new(207).set_body_json(json!([{"status": 204}, {"status": 204}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = api_keys::delete(&client, &["k1", "k2"]).await.unwrap();

    assert_eq!(result.response().unwrap().items.len(), 2);
}

// ── Failures ───────────────────────────────────────────────────────────

#[tokio::test]
async fn partial_failure_lists_every_item() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3.0/response/emails/quarantine"))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!([
            accepted("00000003"),
            {
                "status": 400,
                "body": {"error": {"code": "BadRequest", "message": "Invalid message id"}}
            },
            {
                "status": 403,
                "body": {"error": {"code": "AccessDenied", "message": "Mailbox not in scope"}}
            },
            {"body": {"error": {"code": "InternalServerError", "message": "Unexpected"}}}
        ])))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let requests = [
        EmailMessageRequest::unique_id("u-1"),
        EmailMessageRequest::unique_id("u-2"),
        EmailMessageRequest::unique_id("u-3"),
        EmailMessageRequest::unique_id("u-4"),
    ];
    let result = email::quarantine(&client, &requests).await.unwrap();

    assert_eq!(result.result_code(), ResultCode::Error);
    assert!(result.response().is_none());
    let errors = result.errors();
    assert_eq!(errors.len(), 4);

    assert_eq!(errors[0].status, 202);
    assert_eq!(errors[0].task_id.as_deref(), Some("00000003"));
    assert_eq!(errors[1].status, 400);
    assert_eq!(errors[1].code.as_deref(), Some("BadRequest"));
    assert_eq!(errors[2].status, 403);
    assert_eq!(errors[2].code.as_deref(), Some("AccessDenied"));
    assert_eq!(errors[3].status, 500);
    assert_eq!(errors[3].code.as_deref(), Some("InternalServerError"));
}

#[tokio::test]
async fn top_level_error_is_single_item_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3.0/response/endpoints/restore"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "BadRequest", "message": "Empty request"}
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = endpoints::restore(&client, &[]).await.unwrap();

    let MultiApiResult::Failure(errors) = result else {
        panic!("expected failure");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].status, 400);
    assert_eq!(errors[0].message.as_deref(), Some("Empty request"));
    assert!(errors[0].task_id.is_none());
}

#[tokio::test]
async fn sandbox_url_failure_keeps_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3.0/sandbox/urls/analyze"))
        .and(body_json(json!([{"url": "https://ok.example"}, {"url": "notaurl"}])))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!([
            {
                "status": 202,
                "headers": [{
                    "name": "Operation-Location",
                    "value": "https://api.xdr.trendmicro.com/v3.0/sandbox/tasks/s-1"
                }],
                "body": {"id": "s-1", "url": "https://ok.example"}
            },
            {
                "status": 400,
                "body": {
                    "url": "notaurl",
                    "error": {"code": "BadRequest", "message": "Invalid URL"}
                }
            }
        ])))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = sandbox::submit_urls(&client, &["https://ok.example", "notaurl"])
        .await
        .unwrap();

    let errors = result.errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].task_id.as_deref(), Some("s-1"));
    assert_eq!(errors[1].extra.get("url").map(String::as_str), Some("notaurl"));
    assert_eq!(errors[1].message.as_deref(), Some("Invalid URL"));
}
