//! Endpoint response actions and endpoint inventory.
//!
//! | Function | API Path | Shape |
//! |----------|----------|-------|
//! | [`isolate`] | POST `/response/endpoints/isolate` | multi-status |
//! | [`restore`] | POST `/response/endpoints/restore` | multi-status |
//! | [`collect_file`] | POST `/response/endpoints/collectFile` | multi-status |
//! | [`terminate_process`] | POST `/response/endpoints/terminateProcess` | multi-status |
//! | [`consume_data`] | GET `/eiqs/endpoints` | linkable |
//!
//! Every action item starts a response task; its id is reported in
//! [`MsData::task_id`] and can be fetched with
//! [`get_task_result`](crate::task::get_task_result).

use serde::{Deserialize, Serialize};

use crate::client::{ConsumerError, Tmv1Client};
use crate::multi_status::{MsData, MultiResponse};
use crate::pagination::{ConsumeSummary, LinkablePage};
use crate::request::{ApiRequest, QueryOp, tmv1_query};
use crate::result::{ApiResult, MultiApiResult};

// ── Request types ────────────────────────────────────────────────────

/// Targets one endpoint, by name or agent GUID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_guid: Option<String>,
    /// Description of the response task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EndpointRequest {
    pub fn by_name(endpoint_name: impl Into<String>) -> Self {
        EndpointRequest {
            endpoint_name: Some(endpoint_name.into()),
            ..Default::default()
        }
    }

    pub fn by_agent_guid(agent_guid: impl Into<String>) -> Self {
        EndpointRequest {
            agent_guid: Some(agent_guid.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Collects `file_path` from an endpoint into a password-protected archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectFileRequest {
    #[serde(flatten)]
    pub endpoint: EndpointRequest,
    pub file_path: String,
}

/// Terminates the process started from the file with `file_sha1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateProcessRequest {
    #[serde(flatten)]
    pub endpoint: EndpointRequest,
    pub file_sha1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

// ── Inventory model ──────────────────────────────────────────────────

/// A value with the time it was last updated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedValue<T> {
    pub updated_date_time: String,
    pub value: T,
}

/// One endpoint of the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub agent_guid: String,
    pub endpoint_name: TimedValue<String>,
    #[serde(default)]
    pub login_account: Option<TimedValue<Vec<String>>>,
    #[serde(default)]
    pub mac_address: Option<TimedValue<Vec<String>>>,
    #[serde(default)]
    pub ip: Option<TimedValue<Vec<String>>>,
    #[serde(default)]
    pub os_name: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub os_description: Option<String>,
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default)]
    pub installed_product_codes: Vec<String>,
}

// ── Operations ───────────────────────────────────────────────────────

async fn send_endpoint_tasks<B: Serialize>(
    client: &Tmv1Client,
    path: &str,
    tasks: &[B],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    let body = serde_json::to_value(tasks)?;
    client.send_multi(ApiRequest::post(path).json(body)).await
}

/// Disconnects endpoints from the network while keeping them reachable by
/// the managing Trend Micro server.
///
/// # Errors
///
/// Transport, parse and classification failures escape as `Err`; server
/// errors are returned as `MultiApiResult::Failure`.
pub async fn isolate(
    client: &Tmv1Client,
    endpoints: &[EndpointRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    send_endpoint_tasks(client, "/response/endpoints/isolate", endpoints).await
}

/// Restores network connectivity of isolated endpoints.
///
/// # Errors
///
/// Same as [`isolate`].
pub async fn restore(
    client: &Tmv1Client,
    endpoints: &[EndpointRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    send_endpoint_tasks(client, "/response/endpoints/restore", endpoints).await
}

/// Collects files from endpoints.
///
/// # Errors
///
/// Same as [`isolate`].
pub async fn collect_file(
    client: &Tmv1Client,
    files: &[CollectFileRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    send_endpoint_tasks(client, "/response/endpoints/collectFile", files).await
}

/// Terminates processes running on endpoints.
///
/// # Errors
///
/// Same as [`isolate`].
pub async fn terminate_process(
    client: &Tmv1Client,
    processes: &[TerminateProcessRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    send_endpoint_tasks(client, "/response/endpoints/terminateProcess", processes).await
}

/// Streams every endpoint matching `fields` to `consumer`.
///
/// `fields` become the `TMV1-Query` header (`name eq 'value'` clauses joined
/// by `op`); an empty slice lists all endpoints.
///
/// # Errors
///
/// `Tmv1Error::Consumer` when `consumer` fails; otherwise as [`isolate`].
pub async fn consume_data<F>(
    client: &Tmv1Client,
    consumer: F,
    op: QueryOp,
    fields: &[(&str, &str)],
) -> crate::error::Result<ApiResult<ConsumeSummary>>
where
    F: FnMut(Endpoint) -> Result<(), ConsumerError>,
{
    let request = ApiRequest::get("/eiqs/endpoints").header_opt(tmv1_query(op, fields));
    client
        .send_linkable::<LinkablePage<Endpoint>, _>(request, consumer)
        .await
}
