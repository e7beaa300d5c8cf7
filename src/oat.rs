//! Observed Attack Techniques (OAT) detections and data-pipeline packages.
//!
//! | Function | API Path | Shape |
//! |----------|----------|-------|
//! | [`consume`] | GET `/oat/detections` | linkable, `TMV1-Filter` |
//! | [`get_package`] | GET `/oat/dataPipelines/{id}/packages/{packageId}` | package |

use serde::Deserialize;
use serde_json::Value;

use crate::classify::PackageResp;
use crate::client::{ConsumerError, Tmv1Client};
use crate::pagination::{ConsumeSummary, LinkablePage};
use crate::request::{ApiRequest, QueryOp, tmv1_filter};
use crate::result::ApiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OatRiskLevel {
    Undefined,
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// A detection filter that matched the event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OatFilter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mitre_tactic_ids: Vec<String>,
    #[serde(default)]
    pub mitre_technique_ids: Vec<String>,
    pub risk_level: OatRiskLevel,
    #[serde(rename = "type")]
    pub filter_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OatEndpoint {
    pub endpoint_name: String,
    pub agent_guid: String,
    #[serde(default)]
    pub ips: Vec<String>,
}

/// One OAT detection. `detail` is the raw endpoint or email activity record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OatEvent {
    pub source: String,
    pub uuid: String,
    #[serde(default)]
    pub filters: Vec<OatFilter>,
    #[serde(default)]
    pub endpoint: Option<OatEndpoint>,
    pub entity_type: String,
    pub entity_name: String,
    pub detected_date_time: String,
    #[serde(default)]
    pub ingested_date_time: Option<String>,
    #[serde(default)]
    pub detail: Value,
}

/// Detection and ingestion time bounds for [`consume`]
/// (`yyyy-MM-ddThh:mm:ssZ`). Unset bounds are left to the server defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OatWindow {
    pub detected_start_date_time: Option<String>,
    pub detected_end_date_time: Option<String>,
    pub ingested_start_date_time: Option<String>,
    pub ingested_end_date_time: Option<String>,
}

/// Streams OAT detections matching `fields` to `consumer`, `top` per page.
///
/// # Errors
///
/// `Tmv1Error::Consumer` when `consumer` fails. Transport, parse and
/// classification failures escape as `Err`; server errors are returned as
/// `ApiResult::Failure`.
pub async fn consume<F>(
    client: &Tmv1Client,
    consumer: F,
    window: &OatWindow,
    top: u32,
    op: QueryOp,
    fields: &[(&str, &str)],
) -> crate::error::Result<ApiResult<ConsumeSummary>>
where
    F: FnMut(OatEvent) -> Result<(), ConsumerError>,
{
    let request = ApiRequest::get("/oat/detections")
        .query_opt("detectedStartDateTime", window.detected_start_date_time.as_deref())
        .query_opt("detectedEndDateTime", window.detected_end_date_time.as_deref())
        .query_opt("ingestedStartDateTime", window.ingested_start_date_time.as_deref())
        .query_opt("ingestedEndDateTime", window.ingested_end_date_time.as_deref())
        .query("top", top)
        .header_opt(tmv1_filter(op, fields));
    client
        .send_linkable::<LinkablePage<OatEvent>, _>(request, consumer)
        .await
}

/// Downloads one package of a data pipeline. The whole JSON body is
/// returned as the package.
///
/// # Errors
///
/// Same as [`consume`], without the consumer case.
pub async fn get_package(
    client: &Tmv1Client,
    pipeline_id: &str,
    package_id: &str,
) -> crate::error::Result<ApiResult<PackageResp<Value>>> {
    client
        .send(ApiRequest::get(format!(
            "/oat/dataPipelines/{pipeline_id}/packages/{package_id}"
        )))
        .await
}
