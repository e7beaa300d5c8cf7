//! Suspicious object block list.
//!
//! | Function | API Path |
//! |----------|----------|
//! | [`add_block`] | POST `/response/suspiciousObjects` |
//! | [`delete_block`] | POST `/response/suspiciousObjects/delete` |
//!
//! Both are batch calls: one multi-status item (and one response task) per
//! submitted object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::Tmv1Client;
use crate::multi_status::{MsData, MultiResponse};
use crate::request::ApiRequest;
use crate::result::MultiApiResult;

/// Kind of object on the block list. The wire name doubles as the JSON
/// field carrying the object's value (`{"url": "https://..."}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    Ip,
    Url,
    Domain,
    FileSha1,
    FileSha256,
    SenderMailAddress,
}

impl ObjectType {
    pub const ALL: [ObjectType; 6] = [
        ObjectType::Ip,
        ObjectType::Url,
        ObjectType::Domain,
        ObjectType::FileSha1,
        ObjectType::FileSha256,
        ObjectType::SenderMailAddress,
    ];

    /// JSON field name of this object type.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Ip => "ip",
            ObjectType::Url => "url",
            ObjectType::Domain => "domain",
            ObjectType::FileSha1 => "fileSha1",
            ObjectType::FileSha256 => "fileSha256",
            ObjectType::SenderMailAddress => "senderMailAddress",
        }
    }

    /// First object field present in `body`, as `(type, value)`.
    pub fn find_in(body: &Value) -> Option<(ObjectType, String)> {
        ObjectType::ALL.into_iter().find_map(|object_type| {
            body.get(object_type.as_str())
                .and_then(Value::as_str)
                .map(|value| (object_type, value.to_string()))
        })
    }
}

/// An object to add to or remove from the block list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRequest {
    pub object_type: ObjectType,
    pub object_value: String,
    pub description: Option<String>,
}

impl ObjectRequest {
    pub fn new(object_type: ObjectType, object_value: impl Into<String>) -> Self {
        ObjectRequest {
            object_type,
            object_value: object_value.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut item = Map::new();
        item.insert(
            self.object_type.as_str().to_string(),
            Value::String(self.object_value.clone()),
        );
        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            item.insert("description".to_string(), Value::String(description.to_string()));
        }
        Value::Object(item)
    }
}

fn objects_body(objects: &[ObjectRequest]) -> Value {
    Value::Array(objects.iter().map(ObjectRequest::to_json).collect())
}

/// Adds objects to the block list.
///
/// # Errors
///
/// Transport, parse and classification failures escape as `Err`; server
/// errors are returned as `MultiApiResult::Failure`.
pub async fn add_block(
    client: &Tmv1Client,
    objects: &[ObjectRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    client
        .send_multi(ApiRequest::post("/response/suspiciousObjects").json(objects_body(objects)))
        .await
}

/// Removes objects previously added with [`add_block`].
///
/// # Errors
///
/// Same as [`add_block`].
pub async fn delete_block(
    client: &Tmv1Client,
    objects: &[ObjectRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    client
        .send_multi(
            ApiRequest::post("/response/suspiciousObjects/delete").json(objects_body(objects)),
        )
        .await
}
