//! API key management.
//!
//! | Function | API Path | Shape |
//! |----------|----------|-------|
//! | [`create`] | POST `/iam/apiKeys` | multi-status |
//! | [`get`] | GET `/iam/apiKeys/{id}` | entity + ETag |
//! | [`update`] | PATCH `/iam/apiKeys/{id}` | 204, `If-Match` |
//! | [`delete`] | POST `/iam/apiKeys/delete` | multi-status |
//! | [`consume`] | GET `/iam/apiKeys` | linkable, `TMV1-Filter` |

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::classify::{EtagResp, NoContentResp};
use crate::client::{ConsumerError, Tmv1Client};
use crate::multi_status::{MsDataApiKey, MsStatus, MultiResponse};
use crate::pagination::{ConsumeSummary, LinkablePage};
use crate::request::{ApiRequest, EtagStyle, QueryOp, tmv1_filter};
use crate::result::{ApiResult, MultiApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiKeyStatus {
    Enabled,
    Disabled,
}

/// An API key as listed or fetched. The secret value is only returned by
/// [`create`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    pub status: ApiKeyStatus,
    pub role: String,
    pub expired_date_time: String,
    #[serde(default)]
    pub last_used_date_time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A key to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRequest {
    pub name: String,
    pub role: String,
    /// Validity in months (`0` never expires; the API accepts 0, 1, 3, 6, 12).
    pub months_to_expiration: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ApiKeyStatus,
}

impl ApiKeyRequest {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        ApiKeyRequest {
            name: name.into(),
            role: role.into(),
            months_to_expiration: 0,
            description: None,
            status: ApiKeyStatus::Enabled,
        }
    }
}

/// Fields to change on an existing key; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApiKeyStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Generates API keys.
///
/// # Errors
///
/// Transport, parse and classification failures escape as `Err`; server
/// errors are returned as `MultiApiResult::Failure`.
pub async fn create(
    client: &Tmv1Client,
    keys: &[ApiKeyRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsDataApiKey>>> {
    let body = serde_json::to_value(keys)?;
    client
        .send_multi(ApiRequest::post("/iam/apiKeys").json(body))
        .await
}

/// Fetches one key with its `ETag`.
///
/// # Errors
///
/// Same as [`create`], with failures reported as `ApiResult::Failure`.
pub async fn get(
    client: &Tmv1Client,
    key_id: &str,
) -> crate::error::Result<ApiResult<EtagResp<ApiKey>>> {
    client
        .send(ApiRequest::get(format!("/iam/apiKeys/{key_id}")))
        .await
}

/// Updates a key. `etag` comes from [`get`]; surrounding quotes are
/// stripped before it is sent.
///
/// # Errors
///
/// Same as [`get`].
pub async fn update(
    client: &Tmv1Client,
    key_id: &str,
    etag: &str,
    changes: &ApiKeyUpdate,
) -> crate::error::Result<ApiResult<NoContentResp>> {
    let request = ApiRequest::patch(format!("/iam/apiKeys/{key_id}"))
        .if_match(etag, EtagStyle::Bare)
        .json(serde_json::to_value(changes)?);
    client.send(request).await
}

/// Deletes keys by id.
///
/// # Errors
///
/// Same as [`create`].
pub async fn delete(
    client: &Tmv1Client,
    key_ids: &[&str],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsStatus>>> {
    let body = Value::Array(key_ids.iter().map(|id| json!({ "id": id })).collect());
    client
        .send_multi(ApiRequest::post("/iam/apiKeys/delete").json(body))
        .await
}

/// Streams every key matching `fields` to `consumer`, newest first.
///
/// # Errors
///
/// `Tmv1Error::Consumer` when `consumer` fails; otherwise as [`get`].
pub async fn consume<F>(
    client: &Tmv1Client,
    consumer: F,
    top: u32,
    op: QueryOp,
    fields: &[(&str, &str)],
) -> crate::error::Result<ApiResult<ConsumeSummary>>
where
    F: FnMut(ApiKey) -> Result<(), ConsumerError>,
{
    let request = ApiRequest::get("/iam/apiKeys")
        .query("orderBy", "createdDateTime desc")
        .query("top", top)
        .header_opt(tmv1_filter(op, fields));
    client
        .send_linkable::<LinkablePage<ApiKey>, _>(request, consumer)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults() {
        let json = serde_json::to_value(ApiKeyRequest::new("ci-key", "Master Administrator"))
            .unwrap();
        assert_eq!(
            json,
            json!({
                "name": "ci-key",
                "role": "Master Administrator",
                "monthsToExpiration": 0,
                "status": "enabled"
            })
        );
    }

    #[test]
    fn update_serializes_only_set_fields() {
        let changes = ApiKeyUpdate {
            status: Some(ApiKeyStatus::Disabled),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&changes).unwrap(), json!({"status": "disabled"}));
    }
}
