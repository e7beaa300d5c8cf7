//! Integration tests for single-resource sends using wiremock.
//!
//! Covers the response shapes a single call can produce and how failures are
//! reported:
//!
//! - JSON success, fixed headers (bearer token, user agent)
//! - JSON / HTML / plain-text server errors recovered as `ApiResult::Failure`
//! - 201 `Location` ids, 204 markers, text and binary bodies
//! - Unclassifiable bodies and transport failures escaping as `Err`
//! - Entity `ETag`s and their `If-Match` formatting per resource family

use tmv1::api_keys::{self, ApiKeyStatus, ApiKeyUpdate};
use tmv1::alerts::{self, InvestigationStatus};
use tmv1::cases::{self, CaseStatus, CaseUpdate};
use tmv1::client::Tmv1Client;
use tmv1::config::{ClientConfig, ProxySettings};
use tmv1::custom_scripts::{self, ScriptType};
use tmv1::error::Tmv1Error;
use tmv1::result::{ApiResult, ResultCode};
use tmv1::{oat, system};
use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: creates a client pointed at the given wiremock server.
fn mock_client(server: &MockServer) -> Tmv1Client {
    let config = ClientConfig::new("tests", "mock-token", server.uri())
        .with_proxy(ProxySettings::default());
    Tmv1Client::new(&config).unwrap()
}

// ── Success shapes ─────────────────────────────────────────────────────

#[tokio::test]
async fn connectivity_sends_fixed_headers() {
    let server = MockServer::start().await;
    let user_agent = format!("tests-tmv1-rs/{}", env!("CARGO_PKG_VERSION"));

    Mock::given(method("GET"))
        .and(path("/v3.0/healthcheck/connectivity"))
        .and(header("Authorization", "Bearer mock-token"))
        .and(header("User-Agent", user_agent.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "available"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = system::check_connectivity(&client).await.unwrap();

    assert_eq!(result.result_code(), ResultCode::Success);
    assert_eq!(result.response().unwrap().status, "available");
}

#[tokio::test]
async fn created_id_comes_from_location() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3.0/workbench/alerts/WB-1/notes"))
        .and(body_json(serde_json::json!({"content": "triaged"})))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "https://x/y/z/ABC123"))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let created = alerts::add_note(&client, "WB-1", "triaged")
        .await
        .unwrap()
        .into_response()
        .unwrap();

    assert_eq!(created.id, "ABC123");
    assert_eq!(created.location, "https://x/y/z/ABC123");
}

#[tokio::test]
async fn custom_script_upload_is_multipart() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3.0/response/customScripts"))
        .and(header_regex("Content-Type", "^multipart/form-data"))
        .and(body_string_contains("powershell"))
        .and(body_string_contains("Get-Process"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", "https://host/v3.0/response/customScripts/44c99cb0"),
        )
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let created = custom_scripts::add(&client, ScriptType::Powershell, "ps.ps1", "Get-Process", None)
        .await
        .unwrap();

    assert_eq!(created.response().unwrap().id, "44c99cb0");
}

#[tokio::test]
async fn no_content_returns_marker() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v3.0/response/customScripts/44c99cb0"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = custom_scripts::delete(&client, "44c99cb0").await.unwrap();

    assert!(result.is_success());
}

#[tokio::test]
async fn text_body_is_kept_verbatim() {
    let server = MockServer::start().await;
    let script = "#!/bin/sh\necho triage\n";

    Mock::given(method("GET"))
        .and(path("/v3.0/response/customScripts/44c99cb0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(script))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = custom_scripts::download(&client, "44c99cb0").await.unwrap();

    assert_eq!(result.response().unwrap().text, script);
}

#[tokio::test]
async fn package_wraps_whole_body() {
    let server = MockServer::start().await;
    let body = serde_json::json!({"totalCount": 1, "items": [{"uuid": "u-1"}]});

    Mock::given(method("GET"))
        .and(path("/v3.0/oat/dataPipelines/p-1/packages/pkg-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = oat::get_package(&client, "p-1", "pkg-9").await.unwrap();

    assert_eq!(result.into_response().unwrap().package, body);
}

// ── Server errors ──────────────────────────────────────────────────────

#[tokio::test]
async fn json_error_becomes_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3.0/workbench/alerts/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"code": "NotFound", "message": "Alert not found", "number": 4004}
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = alerts::get(&client, "missing").await.unwrap();

    assert_eq!(result.result_code(), ResultCode::Error);
    let error = result.error().unwrap();
    assert_eq!(error.status, 404);
    assert_eq!(error.code.as_deref(), Some("NotFound"));
    assert_eq!(error.message.as_deref(), Some("Alert not found"));
    assert_eq!(error.number, Some(4004));
}

#[tokio::test]
async fn html_error_page_is_reduced_to_text() {
    let server = MockServer::start().await;
    let page = "<html><head><title>502 Bad Gateway</title></head>\
                <body><center><h1>502 Bad Gateway</h1></center></body></html>";

    Mock::given(method("GET"))
        .and(path("/v3.0/healthcheck/connectivity"))
        .respond_with(ResponseTemplate::new(502).set_body_raw(page, "text/html"))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = system::check_connectivity(&client).await.unwrap();

    let ApiResult::Failure(error) = result else {
        panic!("expected failure");
    };
    assert_eq!(error.status, 502);
    let message = error.message.unwrap();
    assert!(message.contains("502 Bad Gateway"));
    assert!(!message.contains('<'));
}

#[tokio::test]
async fn plain_text_error_keeps_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3.0/healthcheck/connectivity"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let error = system::check_connectivity(&client)
        .await
        .unwrap()
        .into_result()
        .unwrap_err();

    assert_eq!(error.status, 503);
    assert_eq!(error.message.as_deref(), Some("Service Unavailable"));
}

// ── Escaping failures ──────────────────────────────────────────────────

#[tokio::test]
async fn unexpected_no_content_is_parse_model_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3.0/healthcheck/connectivity"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let err = system::check_connectivity(&client).await.unwrap_err();

    match err {
        Tmv1Error::ParseModel { status, expected, .. } => {
            assert_eq!(status, 204);
            assert!(expected.contains("ConnectivityResp"));
        }
        other => panic!("expected ParseModel, got: {other:?}"),
    }
}

#[tokio::test]
async fn binary_body_for_json_model_is_parse_model_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3.0/healthcheck/connectivity"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7".to_vec(), "application/pdf"))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let err = system::check_connectivity(&client).await.unwrap_err();

    assert!(matches!(err, Tmv1Error::ParseModel { status: 200, .. }));
}

#[tokio::test]
async fn malformed_json_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3.0/healthcheck/connectivity"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"status\":", "application/json"))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let err = system::check_connectivity(&client).await.unwrap_err();

    assert!(matches!(err, Tmv1Error::Parse(_)));
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    let config = ClientConfig::new("tests", "mock-token", "http://127.0.0.1:9")
        .with_proxy(ProxySettings::default());
    let client = Tmv1Client::new(&config).unwrap();

    let err = system::check_connectivity(&client).await.unwrap_err();

    assert!(matches!(err, Tmv1Error::Network(_)));
}

// ── ETags ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn alert_etag_is_sent_quoted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3.0/workbench/alerts/WB-9"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "33a64df5")
                .set_body_json(serde_json::json!({
                    "id": "WB-9",
                    "schemaVersion": "1.12",
                    "investigationStatus": "New",
                    "workbenchLink": "https://portal/wb/9",
                    "alertProvider": "SAE",
                    "model": "Suspicious Login",
                    "score": 40,
                    "severity": "medium",
                    "createdDateTime": "2023-04-12T01:00:00Z",
                    "matchedRules": []
                })),
        )
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/v3.0/workbench/alerts/WB-9"))
        .and(header("If-Match", "\"33a64df5\""))
        .and(body_json(serde_json::json!({"investigationStatus": "In Progress"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let fetched = alerts::get(&client, "WB-9").await.unwrap().into_response().unwrap();
    assert_eq!(fetched.etag, "33a64df5");
    assert_eq!(fetched.data.investigation_status, InvestigationStatus::New);

    let updated = alerts::update_status(&client, "WB-9", InvestigationStatus::InProgress, &fetched.etag)
        .await
        .unwrap();
    assert!(updated.is_success());
}

#[tokio::test]
async fn api_key_etag_is_sent_bare() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v3.0/iam/apiKeys/key-1"))
        .and(header("If-Match", "d41d8cd9"))
        .and(body_json(serde_json::json!({"status": "disabled"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let changes = ApiKeyUpdate {
        status: Some(ApiKeyStatus::Disabled),
        ..Default::default()
    };
    let result = api_keys::update(&client, "key-1", "\"d41d8cd9\"", &changes)
        .await
        .unwrap();

    assert!(result.is_success());
}

#[tokio::test]
async fn case_etag_round_trip_is_bare() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3.0/caseManagement/cases/CM-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"a1b2c3\"")
                .set_body_json(serde_json::json!({
                    "id": "CM-1",
                    "name": "Phishing wave",
                    "status": "open",
                    "priority": "high"
                })),
        )
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/v3.0/caseManagement/cases/CM-1"))
        .and(header("If-Match", "a1b2c3"))
        .and(body_json(serde_json::json!({"status": "closed"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let fetched = cases::get(&client, "CM-1").await.unwrap().into_response().unwrap();
    assert_eq!(fetched.etag, "\"a1b2c3\"");

    let changes = CaseUpdate {
        status: Some(CaseStatus::Closed),
        ..Default::default()
    };
    let result = cases::update(&client, "CM-1", &fetched.etag, &changes).await.unwrap();
    assert!(result.is_success());
}

#[tokio::test]
async fn precondition_failure_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v3.0/workbench/alerts/WB-9/notes/7"))
        .respond_with(ResponseTemplate::new(412).set_body_json(serde_json::json!({
            "error": {"code": "ConditionNotMet", "message": "ETag mismatch"}
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server);
    let result = alerts::update_note(&client, "WB-9", "7", "updated", "stale")
        .await
        .unwrap();

    assert_eq!(result.error().unwrap().code.as_deref(), Some("ConditionNotMet"));
}
