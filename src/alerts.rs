//! Workbench alerts and alert notes.
//!
//! | Function | API Path | Shape |
//! |----------|----------|-------|
//! | [`get`] | GET `/workbench/alerts/{id}` | entity + ETag |
//! | [`update_status`] | PATCH `/workbench/alerts/{id}` | 204, quoted `If-Match` |
//! | [`consume`] | GET `/workbench/alerts` | linkable, `TMV1-Filter` |
//! | [`add_note`] | POST `/workbench/alerts/{id}/notes` | 201, `Location` |
//! | [`update_note`] | PATCH `/workbench/alerts/{id}/notes/{noteId}` | 204, quoted `If-Match` |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::classify::{CreatedResp, EtagResp, NoContentResp};
use crate::client::{ConsumerError, Tmv1Client};
use crate::pagination::{ConsumeSummary, LinkablePage};
use crate::request::{ApiRequest, EtagStyle, QueryOp, tmv1_filter};
use crate::result::ApiResult;

// ── Models ───────────────────────────────────────────────────────────

/// Workflow state of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestigationStatus {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "True Positive")]
    TruePositive,
    #[serde(rename = "False Positive")]
    FalsePositive,
    #[serde(rename = "Benign True Positive")]
    BenignTruePositive,
    Closed,
}

/// Detection engine that raised the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AlertProvider {
    /// Search-based detection models.
    #[serde(rename = "SAE")]
    Sae,
    /// Threat intelligence sweeping.
    #[serde(rename = "TI")]
    Ti,
}

/// A workbench alert. Provider-specific fields (matched rules for SAE,
/// campaign and indicator patterns for TI) are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub schema_version: String,
    pub investigation_status: InvestigationStatus,
    pub workbench_link: String,
    pub alert_provider: AlertProvider,
    pub model: String,
    pub score: i64,
    pub severity: String,
    pub created_date_time: String,
    #[serde(default)]
    pub updated_date_time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub indicators: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Creation-time window for [`consume`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertWindow {
    /// Start of the window (`yyyy-MM-ddThh:mm:ssZ`); the server defaults to 24 hours ago.
    pub start_date_time: Option<String>,
    /// End of the window; the server defaults to now.
    pub end_date_time: Option<String>,
}

// ── Operations ───────────────────────────────────────────────────────

fn alert_path(alert_id: &str) -> String {
    format!("/workbench/alerts/{alert_id}")
}

/// Fetches one alert with its `ETag`.
///
/// # Errors
///
/// Transport, parse and classification failures escape as `Err`; server
/// errors are returned as `ApiResult::Failure`.
pub async fn get(
    client: &Tmv1Client,
    alert_id: &str,
) -> crate::error::Result<ApiResult<EtagResp<Alert>>> {
    client.send(ApiRequest::get(alert_path(alert_id))).await
}

/// Changes the investigation status of an alert. `etag` comes from [`get`].
///
/// # Errors
///
/// Same as [`get`].
pub async fn update_status(
    client: &Tmv1Client,
    alert_id: &str,
    status: InvestigationStatus,
    etag: &str,
) -> crate::error::Result<ApiResult<NoContentResp>> {
    let request = ApiRequest::patch(alert_path(alert_id))
        .if_match(etag, EtagStyle::Quoted)
        .json(json!({ "investigationStatus": status }));
    client.send(request).await
}

/// Streams alerts created inside `window` and matching `fields` to
/// `consumer`, newest first.
///
/// # Errors
///
/// `Tmv1Error::Consumer` when `consumer` fails; otherwise as [`get`].
pub async fn consume<F>(
    client: &Tmv1Client,
    consumer: F,
    window: &AlertWindow,
    op: QueryOp,
    fields: &[(&str, &str)],
) -> crate::error::Result<ApiResult<ConsumeSummary>>
where
    F: FnMut(Alert) -> Result<(), ConsumerError>,
{
    let request = ApiRequest::get("/workbench/alerts")
        .query_opt("startDateTime", window.start_date_time.as_deref())
        .query_opt("endDateTime", window.end_date_time.as_deref())
        .query("orderBy", "createdDateTime desc")
        .header_opt(tmv1_filter(op, fields));
    client
        .send_linkable::<LinkablePage<Alert>, _>(request, consumer)
        .await
}

/// Adds a note to an alert; the new note id is taken from `Location`.
///
/// # Errors
///
/// Same as [`get`].
pub async fn add_note(
    client: &Tmv1Client,
    alert_id: &str,
    content: &str,
) -> crate::error::Result<ApiResult<CreatedResp>> {
    let request = ApiRequest::post(format!("{}/notes", alert_path(alert_id)))
        .json(json!({ "content": content }));
    client.send(request).await
}

/// Replaces the content of an alert note.
///
/// # Errors
///
/// Same as [`get`].
pub async fn update_note(
    client: &Tmv1Client,
    alert_id: &str,
    note_id: &str,
    content: &str,
    etag: &str,
) -> crate::error::Result<ApiResult<NoContentResp>> {
    let request = ApiRequest::patch(format!("{}/notes/{note_id}", alert_path(alert_id)))
        .if_match(etag, EtagStyle::Quoted)
        .json(json!({ "content": content }));
    client.send(request).await
}
