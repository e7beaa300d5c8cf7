//! Typed error hierarchy for the tmv1 crate.
//!
//! `Tmv1Error` has one variant per failure boundary of the request pipeline:
//! - `Server` and `MultiStatus` are the *recoverable* variants. The
//!   dispatcher converts them into [`ApiResult`](crate::result::ApiResult) /
//!   [`MultiApiResult`](crate::result::MultiApiResult) failures, so callers
//!   normally never see them as `Err`.
//! - Every other variant (transport, parse, consumer, config, internal) is a
//!   raised fault and escapes the dispatcher as `Err`.

use crate::result::{ErrorDetail, MultiStatusError};

/// Unified error type for all tmv1 library operations.
#[derive(Debug, thiserror::Error)]
pub enum Tmv1Error {
    /// The Vision One API answered with a status outside `[200, 399)`.
    ///
    /// The detail is parsed from the `error` object of a JSON body, from the
    /// visible text of an HTML error page, or is the raw body text.
    #[error("server error: {0}")]
    Server(ErrorDetail),

    /// A multi-status (207) response where at least one item failed.
    ///
    /// Every item of the batch is reported, in submission order, including
    /// the items that individually succeeded.
    #[error("multi-status request failed ({} item(s))", .0.len())]
    MultiStatus(Vec<MultiStatusError>),

    /// No classifier rule matches the response for the expected model.
    ///
    /// This is a contract error between the caller and the API (wrong
    /// expected type for the endpoint), not a retryable condition.
    #[error("could not parse {status} response ({content_type}) into {expected}: {body}")]
    ParseModel {
        /// Name of the expected response model.
        expected: &'static str,
        /// HTTP status code of the response.
        status: u16,
        /// `Content-Type` header of the response, empty when absent.
        content_type: String,
        /// The raw response body, lossily decoded as UTF-8.
        body: String,
    },

    /// JSON deserialization failed for a body that matched a classifier rule.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A transport-level failure (DNS, TCP, TLS, connect or read timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A pagination sink rejected a record; pagination stopped at that record.
    #[error("record consumer failed: {0}")]
    Consumer(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid client or request configuration (base URL, header, proxy).
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the offending setting.
        message: String,
    },

    /// An internal consistency check failed (e.g. a result built with both a
    /// value and an error).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Tmv1Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Tmv1Error::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, Tmv1Error>;
