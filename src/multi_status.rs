//! Multi-status (207) body interpretation.
//!
//! Batch endpoints answer with a JSON array, one element per submitted item:
//!
//! ```json
//! [
//!   {"status": 202, "headers": [{"name": "Operation-Location",
//!                                "value": "https://host/v3.0/response/tasks/00000001"}]},
//!   {"status": 400, "body": {"error": {"code": "BadRequest", "message": "..."}}}
//! ]
//! ```
//!
//! Each element is normalised before it is deserialized: the `body` object
//! (and any nested `error` object) is merged into the item, and the task id
//! is taken from the last path segment of the `Operation-Location` header.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::classify::{Decoded, ModelError, ResponseModel, ResponseShape};
use crate::result::MultiStatusError;

/// Status assumed for an item that does not report one.
pub const DEFAULT_ITEM_STATUS: u16 = 500;

const OPERATION_LOCATION: &str = "Operation-Location";

/// Status of a raw multi-status item, [`DEFAULT_ITEM_STATUS`] when absent.
pub fn item_status(item: &Value) -> u16 {
    item.get("status")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or(DEFAULT_ITEM_STATUS)
}

/// Task id carried by an item's `Operation-Location` header, if any.
pub fn task_id(item: &Map<String, Value>) -> Option<String> {
    item.get("headers")?
        .as_array()?
        .iter()
        .find(|h| {
            h.get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| n.eq_ignore_ascii_case(OPERATION_LOCATION))
        })?
        .get("value")?
        .as_str()?
        .rsplit('/')
        .next()
        .map(str::to_string)
}

/// Flattens a raw item: merges `body` then `error` into the top level, sets
/// `taskId` from the headers and drops the header list.
///
/// Non-object items are returned unchanged.
pub fn normalize_item(item: Value) -> Value {
    let Value::Object(mut map) = item else {
        return item;
    };
    if let Some(task_id) = task_id(&map) {
        map.insert("taskId".to_string(), Value::String(task_id));
    }
    map.remove("headers");
    if let Some(Value::Object(body)) = map.remove("body") {
        map.extend(body);
    }
    if let Some(Value::Object(error)) = map.remove("error") {
        map.extend(error);
    }
    Value::Object(map)
}

/// Builds the per-item error of a failed batch.
///
/// # Errors
///
/// `Tmv1Error::Parse` when the normalised item does not fit
/// [`MultiStatusError`].
pub fn parse_error_item(item: Value) -> crate::error::Result<MultiStatusError> {
    let status = item_status(&item);
    let Value::Object(mut map) = normalize_item(item) else {
        return Ok(MultiStatusError {
            status,
            ..Default::default()
        });
    };
    map.insert("status".to_string(), Value::from(status));
    let url = map.remove("url");
    let mut error: MultiStatusError = serde_json::from_value(Value::Object(map))?;
    if let Some(Value::String(url)) = url {
        error.extra.insert("url".to_string(), url);
    }
    Ok(error)
}

// ── Success models ───────────────────────────────────────────────────

/// The successful items of a batch call, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiResponse<T> {
    /// One entry per submitted item.
    pub items: Vec<T>,
}

impl<T: DeserializeOwned> ResponseModel for MultiResponse<T> {
    const SHAPE: ResponseShape = ResponseShape::MultiStatus;

    fn from_decoded(decoded: Decoded) -> Result<Self, ModelError> {
        let Decoded::Items(items) = decoded else {
            return Err(ModelError::Unsupported);
        };
        let items = items
            .into_iter()
            .map(|item| serde_json::from_value(normalize_item(item)))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(MultiResponse { items })
    }
}

/// A batch item that started an asynchronous task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsData {
    /// Item status (usually 202).
    pub status: u16,
    /// Id of the created task, from `Operation-Location`.
    #[serde(default)]
    pub task_id: Option<String>,
}

/// A batch item of a sandbox URL submission.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsDataUrl {
    pub status: u16,
    #[serde(default)]
    pub task_id: Option<String>,
    /// The submitted URL.
    pub url: String,
    /// Submission id.
    #[serde(default)]
    pub id: Option<String>,
    /// Hashes of the submitted URL.
    #[serde(default)]
    pub digest: Option<Value>,
}

/// A batch item of an API key creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsDataApiKey {
    pub status: u16,
    /// Id of the created key.
    pub id: String,
    /// The secret value, only returned at creation time.
    pub value: String,
    #[serde(default)]
    pub expired_date_time: Option<String>,
}

/// A batch item that only reports a status (deletions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MsStatus {
    pub status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_status_defaults_to_500() {
        assert_eq!(item_status(&json!({"body": {}})), 500);
        assert_eq!(item_status(&json!({"status": 202})), 202);
    }

    #[test]
    fn task_id_is_last_operation_location_segment() {
        let item = json!({
            "status": 202,
            "headers": [
                {"name": "Content-Type", "value": "application/json"},
                {"name": "Operation-Location", "value": "https://api.xdr.trendmicro.com/v3.0/response/tasks/00000003"}
            ]
        });
        let normalized = normalize_item(item);
        assert_eq!(normalized["taskId"], "00000003");
        assert!(normalized.get("headers").is_none());
    }

    #[test]
    fn body_and_error_are_merged() {
        let item = json!({
            "status": 400,
            "body": {"error": {"code": "BadRequest", "message": "Invalid agentGuid", "number": 3}}
        });
        let normalized = normalize_item(item);
        assert_eq!(normalized["code"], "BadRequest");
        assert_eq!(normalized["number"], 3);
        assert!(normalized.get("body").is_none());
        assert!(normalized.get("error").is_none());
    }

    #[test]
    fn error_item_moves_url_into_extra() {
        let item = json!({
            "status": 400,
            "body": {"url": "https://bad.example", "error": {"code": "InvalidUrl", "message": "bad"}}
        });
        let error = parse_error_item(item).unwrap();
        assert_eq!(error.status, 400);
        assert_eq!(error.code.as_deref(), Some("InvalidUrl"));
        assert_eq!(error.extra.get("url").map(String::as_str), Some("https://bad.example"));
    }

    #[test]
    fn error_item_without_status_uses_default() {
        let error = parse_error_item(json!({"body": {"error": {"code": "X"}}})).unwrap();
        assert_eq!(error.status, 500);
    }

    #[test]
    fn multi_response_normalizes_each_item() {
        let decoded = Decoded::Items(vec![
            json!({"status": 202, "headers": [{"name": "Operation-Location", "value": "/v3.0/response/tasks/1"}]}),
            json!({"status": 202, "headers": [{"name": "Operation-Location", "value": "/v3.0/response/tasks/2"}]}),
        ]);
        let parsed = MultiResponse::<MsData>::from_decoded(decoded).unwrap();
        let ids: Vec<_> = parsed.items.iter().filter_map(|i| i.task_id.as_deref()).collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[test]
    fn url_items_keep_submission_fields() {
        let decoded = Decoded::Items(vec![json!({
            "status": 202,
            "headers": [{"name": "Operation-Location", "value": "https://h/v3.0/sandbox/tasks/abc"}],
            "body": {"id": "abc", "url": "https://www.example.com", "digest": {"sha256": "00"}}
        })]);
        let parsed = MultiResponse::<MsDataUrl>::from_decoded(decoded).unwrap();
        assert_eq!(parsed.items[0].url, "https://www.example.com");
        assert_eq!(parsed.items[0].id.as_deref(), Some("abc"));
        assert_eq!(parsed.items[0].task_id.as_deref(), Some("abc"));
    }

    #[test]
    fn non_array_body_is_unsupported() {
        let decoded = Decoded::Json(json!({"status": 202}));
        assert!(matches!(
            MultiResponse::<MsData>::from_decoded(decoded),
            Err(ModelError::Unsupported)
        ));
    }
}
