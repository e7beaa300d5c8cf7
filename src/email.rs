//! Email message response actions.
//!
//! | Function | API Path |
//! |----------|----------|
//! | [`quarantine`] | POST `/response/emails/quarantine` |
//! | [`delete`] | POST `/response/emails/delete` |
//! | [`restore`] | POST `/response/emails/restore` |

use serde::Serialize;

use crate::client::Tmv1Client;
use crate::multi_status::{MsData, MultiResponse};
use crate::request::ApiRequest;
use crate::result::MultiApiResult;

/// Identifies a message either by message id (optionally scoped to a
/// mailbox) or by its unique id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EmailMessageRequest {
    #[serde(rename_all = "camelCase")]
    ById {
        message_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        mail_box: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ByUniqueId {
        unique_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl EmailMessageRequest {
    pub fn message_id(message_id: impl Into<String>, mail_box: Option<String>) -> Self {
        EmailMessageRequest::ById {
            message_id: message_id.into(),
            mail_box,
            description: None,
        }
    }

    pub fn unique_id(unique_id: impl Into<String>) -> Self {
        EmailMessageRequest::ByUniqueId {
            unique_id: unique_id.into(),
            description: None,
        }
    }
}

async fn send_email_tasks(
    client: &Tmv1Client,
    path: &str,
    messages: &[EmailMessageRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    let body = serde_json::to_value(messages)?;
    client.send_multi(ApiRequest::post(path).json(body)).await
}

/// Moves messages to quarantine.
///
/// # Errors
///
/// Transport, parse and classification failures escape as `Err`; server
/// errors are returned as `MultiApiResult::Failure`.
pub async fn quarantine(
    client: &Tmv1Client,
    messages: &[EmailMessageRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    send_email_tasks(client, "/response/emails/quarantine", messages).await
}

/// Deletes messages from their mailboxes.
///
/// # Errors
///
/// Same as [`quarantine`].
pub async fn delete(
    client: &Tmv1Client,
    messages: &[EmailMessageRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    send_email_tasks(client, "/response/emails/delete", messages).await
}

/// Restores quarantined messages.
///
/// # Errors
///
/// Same as [`quarantine`].
pub async fn restore(
    client: &Tmv1Client,
    messages: &[EmailMessageRequest],
) -> crate::error::Result<MultiApiResult<MultiResponse<MsData>>> {
    send_email_tasks(client, "/response/emails/restore", messages).await
}
