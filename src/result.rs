//! Uniform success/error wrappers returned by every dispatcher operation.
//!
//! A call either produced a typed response or a server-reported error, never
//! both. [`ApiResult`] carries a single [`ErrorDetail`]; [`MultiApiResult`]
//! carries one [`MultiStatusError`] per item of a failed batch call.
//! The [`ResultCode`] is derived from which side is populated.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Tmv1Error;

/// Outcome classification of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultCode {
    /// The call produced a response value.
    Success,
    /// The call produced one or more server errors.
    Error,
}

/// A server-reported error for a single call.
///
/// Built from the `error` object of a JSON error body
/// (`{"error": {"code": "...", "message": "..."}}`) with the HTTP status
/// attached, or from the text of an HTML / plain-text error body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// HTTP status code of the failed call.
    #[serde(default)]
    pub status: u16,
    /// Short machine-readable error code (e.g. `"BadRequest"`).
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable error message.
    #[serde(default)]
    pub message: Option<String>,
    /// Numeric error code, when the API provides one.
    #[serde(default)]
    pub number: Option<i64>,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(code) = &self.code {
            write!(f, " {code}")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// A per-item error of a failed multi-status (207) call.
///
/// The item's `body` and `error` sub-objects are merged before parsing, and
/// `task_id` is derived from the item's `Operation-Location` header exactly
/// as for successful items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiStatusError {
    /// Status of this item (not of the whole call).
    #[serde(default)]
    pub status: u16,
    /// Short machine-readable error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable error message.
    #[serde(default)]
    pub message: Option<String>,
    /// Numeric error code, when provided.
    #[serde(default)]
    pub number: Option<i64>,
    /// Identifier of the task created for this item, if any.
    #[serde(default)]
    pub task_id: Option<String>,
    /// Additional item context (the submitted `url` for sandbox URL items).
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl MultiStatusError {
    /// Returns the item's error as a single-call [`ErrorDetail`].
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail {
            status: self.status,
            code: self.code.clone(),
            message: self.message.clone(),
            number: self.number,
        }
    }
}

impl From<ErrorDetail> for MultiStatusError {
    fn from(detail: ErrorDetail) -> Self {
        MultiStatusError {
            status: detail.status,
            code: detail.code,
            message: detail.message,
            number: detail.number,
            ..Default::default()
        }
    }
}

// ── Single result ────────────────────────────────────────────────────

/// Result of a single-resource call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    /// The call succeeded with a parsed response.
    Success(T),
    /// The server reported an error.
    Failure(ErrorDetail),
}

impl<T> ApiResult<T> {
    /// Marks a call as succeeded.
    pub fn success(value: T) -> Self {
        ApiResult::Success(value)
    }

    /// Marks a call as failed with one error.
    pub fn failure(error: ErrorDetail) -> Self {
        ApiResult::Failure(error)
    }

    /// Builds a result from loosely-typed parts, enforcing that exactly one
    /// of `response` / `error` is present.
    ///
    /// # Errors
    ///
    /// `Tmv1Error::Internal` when both or neither are populated.
    pub fn from_parts(response: Option<T>, error: Option<ErrorDetail>) -> crate::error::Result<Self> {
        match (response, error) {
            (Some(value), None) => Ok(ApiResult::Success(value)),
            (None, Some(error)) => Ok(ApiResult::Failure(error)),
            (Some(_), Some(_)) => Err(Tmv1Error::Internal(
                "result cannot carry both a response and an error".to_string(),
            )),
            (None, None) => Err(Tmv1Error::Internal(
                "result must carry either a response or an error".to_string(),
            )),
        }
    }

    /// `Success` iff no error is present.
    pub fn result_code(&self) -> ResultCode {
        match self {
            ApiResult::Success(_) => ResultCode::Success,
            ApiResult::Failure(_) => ResultCode::Error,
        }
    }

    /// Returns `true` for a successful call.
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    /// The response value, if the call succeeded.
    pub fn response(&self) -> Option<&T> {
        match self {
            ApiResult::Success(value) => Some(value),
            ApiResult::Failure(_) => None,
        }
    }

    /// The error, if the call failed.
    pub fn error(&self) -> Option<&ErrorDetail> {
        match self {
            ApiResult::Success(_) => None,
            ApiResult::Failure(error) => Some(error),
        }
    }

    /// Consumes the wrapper and returns the response value, if any.
    pub fn into_response(self) -> Option<T> {
        match self {
            ApiResult::Success(value) => Some(value),
            ApiResult::Failure(_) => None,
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> std::result::Result<T, ErrorDetail> {
        match self {
            ApiResult::Success(value) => Ok(value),
            ApiResult::Failure(error) => Err(error),
        }
    }

    /// Maps the success value, leaving a failure untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            ApiResult::Success(value) => ApiResult::Success(f(value)),
            ApiResult::Failure(error) => ApiResult::Failure(error),
        }
    }
}

// ── Multi result ─────────────────────────────────────────────────────

/// Result of a batch (multi-status) call.
///
/// A batch only succeeds when every item succeeded; any failing item turns
/// the whole call into a `Failure` listing every item in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum MultiApiResult<T> {
    /// Every item succeeded.
    Success(T),
    /// At least one item failed; one entry per item.
    Failure(Vec<MultiStatusError>),
}

impl<T> MultiApiResult<T> {
    /// Marks a batch call as succeeded.
    pub fn success(value: T) -> Self {
        MultiApiResult::Success(value)
    }

    /// Marks a batch call as failed.
    ///
    /// # Errors
    ///
    /// `Tmv1Error::Internal` when `errors` is empty.
    pub fn failure(errors: Vec<MultiStatusError>) -> crate::error::Result<Self> {
        if errors.is_empty() {
            return Err(Tmv1Error::Internal(
                "multi result failure requires at least one error".to_string(),
            ));
        }
        Ok(MultiApiResult::Failure(errors))
    }

    /// Builds a result from loosely-typed parts, enforcing that exactly one
    /// of `response` / `errors` is present (an empty list counts as absent).
    ///
    /// # Errors
    ///
    /// `Tmv1Error::Internal` when both or neither are populated.
    pub fn from_parts(
        response: Option<T>,
        errors: Vec<MultiStatusError>,
    ) -> crate::error::Result<Self> {
        match (response, errors.is_empty()) {
            (Some(value), true) => Ok(MultiApiResult::Success(value)),
            (None, false) => Ok(MultiApiResult::Failure(errors)),
            (Some(_), false) => Err(Tmv1Error::Internal(
                "multi result cannot carry both a response and errors".to_string(),
            )),
            (None, true) => Err(Tmv1Error::Internal(
                "multi result must carry either a response or errors".to_string(),
            )),
        }
    }

    /// `Success` iff no error is present.
    pub fn result_code(&self) -> ResultCode {
        match self {
            MultiApiResult::Success(_) => ResultCode::Success,
            MultiApiResult::Failure(_) => ResultCode::Error,
        }
    }

    /// Returns `true` for a successful batch.
    pub fn is_success(&self) -> bool {
        matches!(self, MultiApiResult::Success(_))
    }

    /// The response value, if the batch succeeded.
    pub fn response(&self) -> Option<&T> {
        match self {
            MultiApiResult::Success(value) => Some(value),
            MultiApiResult::Failure(_) => None,
        }
    }

    /// The per-item errors; empty for a successful batch.
    pub fn errors(&self) -> &[MultiStatusError] {
        match self {
            MultiApiResult::Success(_) => &[],
            MultiApiResult::Failure(errors) => errors,
        }
    }

    /// Consumes the wrapper and returns the response value, if any.
    pub fn into_response(self) -> Option<T> {
        match self {
            MultiApiResult::Success(value) => Some(value),
            MultiApiResult::Failure(_) => None,
        }
    }
}
