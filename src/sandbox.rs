//! Sandbox analysis: submissions, status and analysis artifacts.
//!
//! | Function | API Path | Shape |
//! |----------|----------|-------|
//! | [`submit_file`] | POST `/sandbox/files/analyze` | JSON (multipart request) |
//! | [`submit_urls`] | POST `/sandbox/urls/analyze` | multi-status |
//! | [`get_submission_status`] | GET `/sandbox/tasks/{id}` | JSON |
//! | [`get_analysis_result`] | GET `/sandbox/analysisResults/{id}` | JSON |
//! | [`download_analysis_result`] | GET `/sandbox/analysisResults/{id}/report` | bytes (PDF) |
//! | [`download_investigation_package`] | GET `/sandbox/analysisResults/{id}/investigationPackage` | bytes (zip) |
//! | [`list_suspicious`] | GET `/sandbox/analysisResults/{id}/suspiciousObjects` | JSON |
//!
//! Artifact fetches accept an `Option<&PollConfig>`. With `Some`, the
//! submission status is polled until it leaves `queued` / `running` before
//! the artifact is requested.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::classify::{BytesResp, json_model};
use crate::client::Tmv1Client;
use crate::multi_status::{MsDataUrl, MultiResponse};
use crate::objects::ObjectType;
use crate::poll::PollConfig;
use crate::request::{ApiRequest, MultipartForm};
use crate::result::{ApiResult, MultiApiResult};
use crate::task::{StatusResource, TaskStatus};

// ── Models ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Digest {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SandboxAction {
    AnalyzeFile,
    AnalyzeUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SandboxObjectType {
    Url,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RiskLevel {
    NoRisk,
    Low,
    Medium,
    High,
}

/// Progress of a sandbox submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxSubmissionStatus {
    pub id: String,
    pub status: TaskStatus,
    pub created_date_time: String,
    pub last_action_date_time: String,
    pub action: SandboxAction,
    /// Location of the analysis result once the submission succeeded.
    #[serde(default)]
    pub resource_location: Option<String>,
    /// `true` when a previous analysis of the same object was reused.
    #[serde(default)]
    pub is_cached: Option<bool>,
    #[serde(default)]
    pub digest: Option<Digest>,
    #[serde(default)]
    pub arguments: Option<String>,
}

impl StatusResource for SandboxSubmissionStatus {
    fn status(&self) -> TaskStatus {
        self.status
    }
}

/// Answer to a file submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFileResp {
    /// Submission id, used for every later sandbox call.
    pub id: String,
    pub digest: Digest,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxAnalysisResult {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: SandboxObjectType,
    pub analysis_completion_date_time: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub true_file_type: Option<String>,
    #[serde(default)]
    pub digest: Option<Digest>,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub detection_names: Vec<String>,
    #[serde(default)]
    pub threat_types: Vec<String>,
}

/// An object found suspicious during analysis, reported under its type
/// name the same way as block-list objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSuspiciousObject {
    pub risk_level: RiskLevel,
    pub analysis_completion_date_time: String,
    pub expired_date_time: String,
    pub root_sha1: String,
    pub object_type: ObjectType,
    pub value: String,
}

impl<'de> Deserialize<'de> for SandboxSuspiciousObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Fields {
            risk_level: RiskLevel,
            analysis_completion_date_time: String,
            expired_date_time: String,
            root_sha1: String,
        }

        let body = Value::deserialize(deserializer)?;
        let (object_type, value) = ObjectType::find_in(&body)
            .ok_or_else(|| D::Error::custom("suspicious object carries no object field"))?;
        let fields = Fields::deserialize(body).map_err(D::Error::custom)?;
        Ok(SandboxSuspiciousObject {
            risk_level: fields.risk_level,
            analysis_completion_date_time: fields.analysis_completion_date_time,
            expired_date_time: fields.expired_date_time,
            root_sha1: fields.root_sha1,
            object_type,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SandboxSuspiciousList {
    #[serde(default)]
    pub items: Vec<SandboxSuspiciousObject>,
}

json_model!(
    SandboxSubmissionStatus,
    SubmitFileResp,
    SandboxAnalysisResult,
    SandboxSuspiciousList,
);

// ── Requests ─────────────────────────────────────────────────────────

/// Optional settings of a file submission. Each set value is sent
/// Base64-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxFileOptions {
    /// Password of the submitted document.
    pub document_password: Option<String>,
    /// Password of the submitted archive.
    pub archive_password: Option<String>,
    /// Command line arguments for PE and script files.
    pub arguments: Option<String>,
}

fn b64(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(|v| BASE64.encode(v))
}

fn file_form(file: Bytes, file_name: &str, options: &SandboxFileOptions) -> MultipartForm {
    MultipartForm::new()
        .text_opt("documentPassword", b64(options.document_password.as_deref()))
        .text_opt("archivePassword", b64(options.archive_password.as_deref()))
        .text_opt("arguments", b64(options.arguments.as_deref()))
        .file("file", file_name, "application/octet-stream", file)
}

// ── Operations ───────────────────────────────────────────────────────

/// Submits a file for analysis.
///
/// # Errors
///
/// Transport, parse and classification failures escape as `Err`; server
/// errors are returned as `ApiResult::Failure`.
pub async fn submit_file(
    client: &Tmv1Client,
    file: impl Into<Bytes>,
    file_name: &str,
    options: &SandboxFileOptions,
) -> crate::error::Result<ApiResult<SubmitFileResp>> {
    let form = file_form(file.into(), file_name, options);
    client
        .send(ApiRequest::post("/sandbox/files/analyze").multipart(form))
        .await
}

/// Submits URLs for analysis, one multi-status item per URL.
///
/// # Errors
///
/// Same as [`submit_file`], with failures reported as
/// `MultiApiResult::Failure`.
pub async fn submit_urls(
    client: &Tmv1Client,
    urls: &[&str],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsDataUrl>>> {
    let body = Value::Array(urls.iter().map(|url| json!({ "url": url })).collect());
    client
        .send_multi(ApiRequest::post("/sandbox/urls/analyze").json(body))
        .await
}

/// Fetches the status of a submission once.
///
/// # Errors
///
/// Same as [`submit_file`].
pub async fn get_submission_status(
    client: &Tmv1Client,
    submit_id: &str,
) -> crate::error::Result<ApiResult<SandboxSubmissionStatus>> {
    client
        .send(ApiRequest::get(format!("/sandbox/tasks/{submit_id}")))
        .await
}

/// Fetches the analysis result summary.
///
/// # Errors
///
/// Same as [`submit_file`].
pub async fn get_analysis_result(
    client: &Tmv1Client,
    submit_id: &str,
    poll: Option<&PollConfig>,
) -> crate::error::Result<ApiResult<SandboxAnalysisResult>> {
    let path = format!("/sandbox/analysisResults/{submit_id}");
    client.send_sandbox_result(&path, submit_id, poll).await
}

/// Downloads the analysis report as PDF.
///
/// # Errors
///
/// Same as [`submit_file`].
pub async fn download_analysis_result(
    client: &Tmv1Client,
    submit_id: &str,
    poll: Option<&PollConfig>,
) -> crate::error::Result<ApiResult<BytesResp>> {
    let path = format!("/sandbox/analysisResults/{submit_id}/report");
    client.send_sandbox_result(&path, submit_id, poll).await
}

/// Downloads the investigation package (zip).
///
/// # Errors
///
/// Same as [`submit_file`].
pub async fn download_investigation_package(
    client: &Tmv1Client,
    submit_id: &str,
    poll: Option<&PollConfig>,
) -> crate::error::Result<ApiResult<BytesResp>> {
    let path = format!("/sandbox/analysisResults/{submit_id}/investigationPackage");
    client.send_sandbox_result(&path, submit_id, poll).await
}

/// Lists the suspicious objects found by the analysis.
///
/// # Errors
///
/// Same as [`submit_file`].
pub async fn list_suspicious(
    client: &Tmv1Client,
    submit_id: &str,
    poll: Option<&PollConfig>,
) -> crate::error::Result<ApiResult<SandboxSuspiciousList>> {
    let path = format!("/sandbox/analysisResults/{submit_id}/suspiciousObjects");
    client.send_sandbox_result(&path, submit_id, poll).await
}
