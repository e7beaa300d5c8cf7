//! Async Rust client library for the Trend Vision One REST API.
//!
//! Wraps the v3.0 API behind typed operations: every call returns an
//! [`ApiResult`] (or [`MultiApiResult`] for bulk endpoints answering
//! `207 Multi-Status`) so that server-side refusals are data, while
//! transport, parsing and configuration failures stay ordinary `Err`s.
//! List endpoints are consumed page by page through a caller-supplied
//! closure, and long-running tasks can be polled until they settle.
//!
//! # Modules
//!
//! - [`client`] — Request dispatcher (`Tmv1Client`): single, multi-status,
//!   linkable, polled and sandbox-artifact sends.
//! - [`classify`] — HTTP validation and response-shape classification.
//! - [`config`] — Client settings, timeouts and proxies.
//! - [`error`] — Typed error hierarchy (`Tmv1Error`).
//! - [`multi_status`] — Per-item results of bulk endpoints.
//! - [`pagination`] — Linkable pages and `nextLink` resolution.
//! - [`poll`] — Status polling with interval and timeout.
//! - [`registry`] — Opt-in process-wide shared client.
//! - [`request`] — Request builder, ETag and filter-header helpers.
//! - [`result`] — `ApiResult` / `MultiApiResult` wrappers.
//! - [`task`] — Response task status and action-specific results.
//! - [`alerts`], [`api_keys`], [`cases`], [`custom_scripts`], [`email`],
//!   [`endpoints`], [`oat`], [`objects`], [`sandbox`], [`system`] — Resource
//!   operations.
//!
//! # Quick Start
//!
//! ```ignore
//! use tmv1::client::Tmv1Client;
//! use tmv1::config::ClientConfig;
//! use tmv1::endpoints::{self, EndpointRequest};
//! use tmv1::task;
//!
//! let config = ClientConfig::new("soar", token, "https://api.xdr.trendmicro.com");
//! let client = Tmv1Client::new(&config)?;
//! let result = endpoints::isolate(&client, &[EndpointRequest::by_name("host-1")]).await?;
//! if let Some(batch) = result.response() {
//!     for task_id in batch.items.iter().filter_map(|item| item.task_id.as_deref()) {
//!         let polled = task::get_task_result(&client, task_id, Some(&Default::default())).await?;
//!     }
//! }
//! ```

pub mod alerts;
pub mod api_keys;
pub mod cases;
pub mod classify;
pub mod client;
pub mod config;
pub mod custom_scripts;
pub mod email;
pub mod endpoints;
pub mod error;
pub mod multi_status;
pub mod oat;
pub mod objects;
pub mod pagination;
pub mod poll;
pub mod registry;
pub mod request;
pub mod result;
pub mod sandbox;
pub mod system;
pub mod task;

pub use client::Tmv1Client;
pub use config::ClientConfig;
pub use error::{Result, Tmv1Error};
pub use result::{ApiResult, MultiApiResult, ResultCode};
