//! Response task model for Vision One asynchronous actions.
//!
//! Response actions (isolate, collect file, block, ...) run asynchronously.
//! The API exposes their progress at `GET /response/tasks/{id}`, whose body
//! always carries the common [`BaseTaskResp`] fields plus action-specific
//! fields. The concrete shape is selected by the body's `action`
//! discriminator through a fixed table:
//!
//! | `action` | Result type |
//! |----------|-------------|
//! | `collectFile` | [`CollectFileTaskResp`] |
//! | `isolate`, `restoreIsolate` | [`EndpointTaskResp`] |
//! | `terminateProcess` | [`TerminateProcessTaskResp`] |
//! | `quarantineMessage`, `deleteMessage`, `restoreMessage` | [`EmailMessageTaskResp`] |
//! | `block`, `restoreBlock` | [`BlockListTaskResp`] |
//! | `resetPassword`, `enableAccount`, `disableAccount`, `forceSignOut` | [`AccountTaskResp`] |
//! | `submitSandbox` | [`SandboxSubmitUrlTaskResp`] |
//! | `runCustomScript` | [`CustomScriptTaskResp`] |
//! | any other tag | [`BaseTaskResp`] |

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::classify::{Decoded, ModelError, ResponseModel, ResponseShape, json_model};
use crate::client::Tmv1Client;
use crate::objects::ObjectType;
use crate::poll::PollConfig;
use crate::result::ApiResult;

// ── Status ───────────────────────────────────────────────────────────

/// Lifecycle status of a response task or sandbox submission.
///
/// Only `Queued` and `Running` are in-progress; every other value is treated
/// as terminal by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Failed,
    Queued,
    Rejected,
    Canceled,
    Running,
    Succeeded,
    PendingApproval,
}

impl TaskStatus {
    /// `true` unless the task is still queued or running.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Queued | TaskStatus::Running)
    }
}

/// A resource that reports a [`TaskStatus`] and can therefore be polled.
pub trait StatusResource {
    /// Current status of the resource.
    fn status(&self) -> TaskStatus;
}

// ── Action table ─────────────────────────────────────────────────────

/// Action tags reported in the `action` field of a task result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskAction {
    CollectFile,
    CollectEvidence,
    CollectNetworkAnalysisPackage,
    IsolateEndpoint,
    IsolateEndpointMultiple,
    RestoreEndpoint,
    RestoreEndpointMultiple,
    TerminateProcess,
    DumpProcessMemory,
    QuarantineMessage,
    DeleteMessage,
    RestoreMessage,
    BlockSuspicious,
    RemoveSuspicious,
    ResetPassword,
    SubmitSandbox,
    EnableAccount,
    DisableAccount,
    ForceSignOut,
    RemoteShell,
    RunInvestigationKit,
    RunCustomScript,
    RunCustomScriptMultiple,
    RunOsQuery,
    RunYaraRules,
}

/// Concrete result type selected for a task action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    CollectFile,
    Endpoint,
    TerminateProcess,
    EmailMessage,
    BlockList,
    Account,
    SandboxSubmitUrl,
    CustomScript,
    Base,
}

const ACTIONS: &[(TaskAction, &str, TaskKind)] = &[
    (TaskAction::CollectFile, "collectFile", TaskKind::CollectFile),
    (TaskAction::CollectEvidence, "collectEvidence", TaskKind::Base),
    (
        TaskAction::CollectNetworkAnalysisPackage,
        "collectNetworkAnalysisPackage",
        TaskKind::Base,
    ),
    (TaskAction::IsolateEndpoint, "isolate", TaskKind::Endpoint),
    (TaskAction::IsolateEndpointMultiple, "isolateForMultiple", TaskKind::Base),
    (TaskAction::RestoreEndpoint, "restoreIsolate", TaskKind::Endpoint),
    (
        TaskAction::RestoreEndpointMultiple,
        "restoreIsolateForMultiple",
        TaskKind::Base,
    ),
    (TaskAction::TerminateProcess, "terminateProcess", TaskKind::TerminateProcess),
    (TaskAction::DumpProcessMemory, "dumpProcessMemory", TaskKind::Base),
    (TaskAction::QuarantineMessage, "quarantineMessage", TaskKind::EmailMessage),
    (TaskAction::DeleteMessage, "deleteMessage", TaskKind::EmailMessage),
    (TaskAction::RestoreMessage, "restoreMessage", TaskKind::EmailMessage),
    (TaskAction::BlockSuspicious, "block", TaskKind::BlockList),
    (TaskAction::RemoveSuspicious, "restoreBlock", TaskKind::BlockList),
    (TaskAction::ResetPassword, "resetPassword", TaskKind::Account),
    (TaskAction::SubmitSandbox, "submitSandbox", TaskKind::SandboxSubmitUrl),
    (TaskAction::EnableAccount, "enableAccount", TaskKind::Account),
    (TaskAction::DisableAccount, "disableAccount", TaskKind::Account),
    (TaskAction::ForceSignOut, "forceSignOut", TaskKind::Account),
    (TaskAction::RemoteShell, "remoteShell", TaskKind::Base),
    (TaskAction::RunInvestigationKit, "runInvestigationKit", TaskKind::Base),
    (TaskAction::RunCustomScript, "runCustomScript", TaskKind::CustomScript),
    (
        TaskAction::RunCustomScriptMultiple,
        "runCustomScriptForMultiple",
        TaskKind::Base,
    ),
    (TaskAction::RunOsQuery, "runOsquery", TaskKind::Base),
    (TaskAction::RunYaraRules, "runYaraRules", TaskKind::Base),
];

impl TaskAction {
    /// Looks up an action by its wire tag.
    pub fn from_tag(tag: &str) -> Option<TaskAction> {
        ACTIONS
            .iter()
            .find(|(_, t, _)| *t == tag)
            .map(|(action, _, _)| *action)
    }

    /// The wire tag of this action.
    pub fn tag(self) -> &'static str {
        ACTIONS
            .iter()
            .find(|(a, _, _)| *a == self)
            .map(|(_, tag, _)| *tag)
            .unwrap_or_default()
    }

    /// The concrete result type this action produces.
    pub fn kind(self) -> TaskKind {
        ACTIONS
            .iter()
            .find(|(a, _, _)| *a == self)
            .map_or(TaskKind::Base, |(_, _, kind)| *kind)
    }
}

/// Result type for a raw action tag; unknown tags map to [`TaskKind::Base`].
pub fn kind_for_tag(tag: &str) -> TaskKind {
    TaskAction::from_tag(tag).map_or(TaskKind::Base, TaskAction::kind)
}

// ── Task results ─────────────────────────────────────────────────────

/// Fields shared by every task result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseTaskResp {
    pub id: String,
    pub status: TaskStatus,
    pub created_date_time: String,
    pub last_action_date_time: String,
    /// Wire tag of the action, e.g. `"isolate"`.
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Account that triggered the action.
    #[serde(default)]
    pub account: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointTaskResp {
    #[serde(flatten)]
    pub base: BaseTaskResp,
    pub agent_guid: String,
    pub endpoint_name: String,
}

/// Result of a `collectFile` task; `resource_location` points at the
/// password-protected archive once the task succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectFileTaskResp {
    #[serde(flatten)]
    pub base: BaseTaskResp,
    pub agent_guid: String,
    pub endpoint_name: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_sha1: Option<String>,
    #[serde(default)]
    pub file_sha256: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub resource_location: Option<String>,
    #[serde(default)]
    pub expired_date_time: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateProcessTaskResp {
    #[serde(flatten)]
    pub base: BaseTaskResp,
    pub agent_guid: String,
    pub endpoint_name: String,
    pub file_sha1: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// One message handled by an email task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessageTask {
    pub last_action_date_time: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub mail_box: Option<String>,
    #[serde(default)]
    pub message_subject: Option<String>,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessageTaskResp {
    #[serde(flatten)]
    pub base: BaseTaskResp,
    #[serde(default)]
    pub tasks: Vec<EmailMessageTask>,
}

/// Result of a `block` / `restoreBlock` task.
///
/// The API reports the object under its type name (`"url": "..."`,
/// `"fileSha1": "..."`); it is surfaced here as `(object_type, value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockListTaskResp {
    pub base: BaseTaskResp,
    pub object_type: ObjectType,
    pub value: String,
}

impl<'de> Deserialize<'de> for BlockListTaskResp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let body = Value::deserialize(deserializer)?;
        let (object_type, value) = ObjectType::find_in(&body)
            .ok_or_else(|| D::Error::custom("block list task carries no object field"))?;
        let base = BaseTaskResp::deserialize(body).map_err(D::Error::custom)?;
        Ok(BlockListTaskResp {
            base,
            object_type,
            value,
        })
    }
}

/// One account handled by an account task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTask {
    pub account_name: String,
    /// Identity provider, e.g. `"AAD"`.
    pub iam: String,
    pub last_action_date_time: String,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTaskResp {
    #[serde(flatten)]
    pub base: BaseTaskResp,
    #[serde(default)]
    pub tasks: Vec<AccountTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxSubmitUrlTaskResp {
    #[serde(flatten)]
    pub base: BaseTaskResp,
    pub url: String,
    pub sandbox_task_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomScriptTaskResp {
    #[serde(flatten)]
    pub base: BaseTaskResp,
    pub file_name: String,
    pub agent_guid: String,
    pub endpoint_name: String,
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub resource_location: Option<String>,
    #[serde(default)]
    pub expired_date_time: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

json_model!(
    BaseTaskResp,
    EndpointTaskResp,
    CollectFileTaskResp,
    TerminateProcessTaskResp,
    EmailMessageTaskResp,
    BlockListTaskResp,
    AccountTaskResp,
    SandboxSubmitUrlTaskResp,
    CustomScriptTaskResp,
);

impl StatusResource for BaseTaskResp {
    fn status(&self) -> TaskStatus {
        self.status
    }
}

macro_rules! base_status {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl StatusResource for $ty {
                fn status(&self) -> TaskStatus {
                    self.base.status
                }
            }
        )+
    };
}

base_status!(
    EndpointTaskResp,
    CollectFileTaskResp,
    TerminateProcessTaskResp,
    EmailMessageTaskResp,
    BlockListTaskResp,
    AccountTaskResp,
    SandboxSubmitUrlTaskResp,
    CustomScriptTaskResp,
);

// ── Polymorphic result ───────────────────────────────────────────────

/// A task result whose concrete type was selected by its `action` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    CollectFile(CollectFileTaskResp),
    Endpoint(EndpointTaskResp),
    TerminateProcess(TerminateProcessTaskResp),
    EmailMessage(EmailMessageTaskResp),
    BlockList(BlockListTaskResp),
    Account(AccountTaskResp),
    SandboxSubmitUrl(SandboxSubmitUrlTaskResp),
    CustomScript(CustomScriptTaskResp),
    /// Actions without a dedicated type, including unrecognised tags.
    Base(BaseTaskResp),
}

impl TaskResult {
    /// Parses a task body according to its action tag.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body does not fit the type
    /// selected for `action`.
    pub fn from_action(action: &str, body: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind_for_tag(action) {
            TaskKind::CollectFile => TaskResult::CollectFile(serde_json::from_value(body)?),
            TaskKind::Endpoint => TaskResult::Endpoint(serde_json::from_value(body)?),
            TaskKind::TerminateProcess => {
                TaskResult::TerminateProcess(serde_json::from_value(body)?)
            }
            TaskKind::EmailMessage => TaskResult::EmailMessage(serde_json::from_value(body)?),
            TaskKind::BlockList => TaskResult::BlockList(serde_json::from_value(body)?),
            TaskKind::Account => TaskResult::Account(serde_json::from_value(body)?),
            TaskKind::SandboxSubmitUrl => {
                TaskResult::SandboxSubmitUrl(serde_json::from_value(body)?)
            }
            TaskKind::CustomScript => TaskResult::CustomScript(serde_json::from_value(body)?),
            TaskKind::Base => TaskResult::Base(serde_json::from_value(body)?),
        })
    }

    /// The common task fields.
    pub fn base(&self) -> &BaseTaskResp {
        match self {
            TaskResult::CollectFile(r) => &r.base,
            TaskResult::Endpoint(r) => &r.base,
            TaskResult::TerminateProcess(r) => &r.base,
            TaskResult::EmailMessage(r) => &r.base,
            TaskResult::BlockList(r) => &r.base,
            TaskResult::Account(r) => &r.base,
            TaskResult::SandboxSubmitUrl(r) => &r.base,
            TaskResult::CustomScript(r) => &r.base,
            TaskResult::Base(r) => r,
        }
    }

    /// Which concrete type was selected.
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskResult::CollectFile(_) => TaskKind::CollectFile,
            TaskResult::Endpoint(_) => TaskKind::Endpoint,
            TaskResult::TerminateProcess(_) => TaskKind::TerminateProcess,
            TaskResult::EmailMessage(_) => TaskKind::EmailMessage,
            TaskResult::BlockList(_) => TaskKind::BlockList,
            TaskResult::Account(_) => TaskKind::Account,
            TaskResult::SandboxSubmitUrl(_) => TaskKind::SandboxSubmitUrl,
            TaskResult::CustomScript(_) => TaskKind::CustomScript,
            TaskResult::Base(_) => TaskKind::Base,
        }
    }
}

impl ResponseModel for TaskResult {
    const SHAPE: ResponseShape = ResponseShape::TaskResult;

    fn from_decoded(decoded: Decoded) -> Result<Self, ModelError> {
        match decoded {
            Decoded::Task {
                action: Some(action),
                body,
            } => Ok(TaskResult::from_action(&action, body)?),
            _ => Err(ModelError::Unsupported),
        }
    }
}

impl StatusResource for TaskResult {
    fn status(&self) -> TaskStatus {
        self.base().status
    }
}

// ── Operations ───────────────────────────────────────────────────────

/// Fetches a response task, refining it by its action tag.
///
/// With `poll` set, the task is re-fetched until it leaves `queued` /
/// `running` or the poll timeout elapses; the last fetched state is returned
/// either way.
///
/// # Errors
///
/// Transport, parse and classification failures escape as `Err`; server
/// errors are returned as `ApiResult::Failure`.
pub async fn get_task_result(
    client: &Tmv1Client,
    task_id: &str,
    poll: Option<&PollConfig>,
) -> crate::error::Result<ApiResult<TaskResult>> {
    client.send_task_result(task_id, poll).await
}

/// Like [`get_task_result`], but parses into a caller-chosen type.
///
/// # Errors
///
/// Same as [`get_task_result`].
pub async fn get_task_result_as<T>(
    client: &Tmv1Client,
    task_id: &str,
    poll: Option<&PollConfig>,
) -> crate::error::Result<ApiResult<T>>
where
    T: ResponseModel + StatusResource,
{
    client.send_task_result(task_id, poll).await
}
