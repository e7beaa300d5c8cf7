//! Custom response scripts.
//!
//! | Function | API Path | Shape |
//! |----------|----------|-------|
//! | [`add`] | POST `/response/customScripts` | multipart, 201 |
//! | [`download`] | GET `/response/customScripts/{id}` | text |
//! | [`delete`] | DELETE `/response/customScripts/{id}` | 204 |

use serde::{Deserialize, Serialize};

use crate::classify::{CreatedResp, NoContentResp, TextResp};
use crate::client::Tmv1Client;
use crate::request::{ApiRequest, MultipartForm};
use crate::result::ApiResult;

/// Interpreter of a custom script (`.ps1` or `.sh`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptType {
    Powershell,
    Bash,
}

impl ScriptType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptType::Powershell => "powershell",
            ScriptType::Bash => "bash",
        }
    }
}

fn script_form(
    file_type: ScriptType,
    file_name: &str,
    content: &str,
    description: Option<&str>,
) -> MultipartForm {
    MultipartForm::new()
        .text("fileType", file_type.as_str())
        .text_opt("description", description)
        .file("file", file_name, "text/plain", content.as_bytes().to_vec())
}

/// Uploads a UTF-8 script; the new script id is taken from `Location`.
///
/// # Errors
///
/// Transport, parse and classification failures escape as `Err`; server
/// errors are returned as `ApiResult::Failure`.
pub async fn add(
    client: &Tmv1Client,
    file_type: ScriptType,
    file_name: &str,
    content: &str,
    description: Option<&str>,
) -> crate::error::Result<ApiResult<CreatedResp>> {
    let form = script_form(file_type, file_name, content, description);
    client
        .send(ApiRequest::post("/response/customScripts").multipart(form))
        .await
}

/// Downloads the plain-text content of a script.
///
/// # Errors
///
/// Same as [`add`].
pub async fn download(
    client: &Tmv1Client,
    script_id: &str,
) -> crate::error::Result<ApiResult<TextResp>> {
    client
        .send(ApiRequest::get(format!("/response/customScripts/{script_id}")))
        .await
}

/// Deletes a script.
///
/// # Errors
///
/// Same as [`add`].
pub async fn delete(
    client: &Tmv1Client,
    script_id: &str,
) -> crate::error::Result<ApiResult<NoContentResp>> {
    client
        .send(ApiRequest::delete(format!("/response/customScripts/{script_id}")))
        .await
}
