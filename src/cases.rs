//! Case management cases.
//!
//! | Function | API Path | Shape |
//! |----------|----------|-------|
//! | [`get`] | GET `/caseManagement/cases/{id}` | entity + ETag |
//! | [`update`] | PATCH `/caseManagement/cases/{id}` | 204, `If-Match` |
//! | [`consume`] | GET `/caseManagement/cases` | linkable, `TMV1-Filter` |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::{EtagResp, NoContentResp};
use crate::client::{ConsumerError, Tmv1Client};
use crate::pagination::{ConsumeSummary, LinkablePage};
use crate::request::{ApiRequest, EtagStyle, QueryOp, tmv1_filter};
use crate::result::ApiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaseStatus {
    Open,
    InProgress,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CasePriority {
    Low,
    Medium,
    High,
    Critical,
}

/// A case as returned by get and list. Fields not modelled here are kept in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub name: String,
    pub status: CaseStatus,
    pub priority: CasePriority,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_date_time: Option<String>,
    #[serde(default)]
    pub updated_date_time: Option<String>,
    #[serde(default)]
    pub associated_item_ids: Vec<String>,
    #[serde(default)]
    pub related_case_ids: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields to change on a case; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<CasePriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "externalTicketCreatedDateTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_ticket_created_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_item_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_case_ids: Option<Vec<String>>,
}

/// Creation-time window for [`consume`] (`yyyy-MM-ddThh:mm:ssZ`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseWindow {
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
}

fn case_path(case_id: &str) -> String {
    format!("/caseManagement/cases/{case_id}")
}

/// Fetches one case with its `ETag`.
///
/// # Errors
///
/// Transport, parse and classification failures escape as `Err`; server
/// errors are returned as `ApiResult::Failure`.
pub async fn get(
    client: &Tmv1Client,
    case_id: &str,
) -> crate::error::Result<ApiResult<EtagResp<Case>>> {
    client.send(ApiRequest::get(case_path(case_id))).await
}

/// Updates a case. `etag` comes from [`get`]; surrounding quotes are
/// stripped before it is sent.
///
/// # Errors
///
/// Same as [`get`].
pub async fn update(
    client: &Tmv1Client,
    case_id: &str,
    etag: &str,
    changes: &CaseUpdate,
) -> crate::error::Result<ApiResult<NoContentResp>> {
    let request = ApiRequest::patch(case_path(case_id))
        .if_match(etag, EtagStyle::Bare)
        .json(serde_json::to_value(changes)?);
    client.send(request).await
}

/// Streams cases created inside `window` and matching `fields` to
/// `consumer`, newest first.
///
/// # Errors
///
/// `Tmv1Error::Consumer` when `consumer` fails; otherwise as [`get`].
pub async fn consume<F>(
    client: &Tmv1Client,
    consumer: F,
    window: &CaseWindow,
    top: u32,
    op: QueryOp,
    fields: &[(&str, &str)],
) -> crate::error::Result<ApiResult<ConsumeSummary>>
where
    F: FnMut(Case) -> Result<(), ConsumerError>,
{
    let request = ApiRequest::get("/caseManagement/cases")
        .query("top", top)
        .query_opt("startDateTime", window.start_date_time.as_deref())
        .query_opt("endDateTime", window.end_date_time.as_deref())
        .query("orderBy", "createdDateTime desc")
        .header_opt(tmv1_filter(op, fields));
    client
        .send_linkable::<LinkablePage<Case>, _>(request, consumer)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_serializes_only_set_fields() {
        let changes = CaseUpdate {
            status: Some(CaseStatus::InProgress),
            external_ticket_created_date_time: Some("2023-04-12T01:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            json!({
                "status": "inProgress",
                "externalTicketCreatedDateTime": "2023-04-12T01:00:00Z"
            })
        );
    }

    #[test]
    fn case_keeps_unmodelled_fields() {
        let case: Case = serde_json::from_value(json!({
            "id": "CM-1",
            "name": "Phishing wave",
            "status": "open",
            "priority": "high",
            "holder": {"name": "analyst"}
        }))
        .unwrap();
        assert_eq!(case.priority, CasePriority::High);
        assert_eq!(case.extra["holder"]["name"], "analyst");
        assert!(case.associated_item_ids.is_empty());
    }
}
