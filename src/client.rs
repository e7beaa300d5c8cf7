//! Request dispatcher for the Trend Vision One REST API.
//!
//! `Tmv1Client` wraps a `reqwest::Client` configured from a
//! [`ClientConfig`] and runs every call through the same pipeline:
//!
//! 1. Build the request: fixed `Authorization` / `User-Agent` headers, then
//!    the caller's headers on top, query parameters and JSON or multipart
//!    body.
//! 2. Send it and read the whole response.
//! 3. [`validate`] the HTTP outcome (status range, multi-status items).
//! 4. [`parse_data`] into the expected model using the shape classifier.
//!
//! Server-reported failures are recovered into
//! [`ApiResult`] / [`MultiApiResult`] values; transport, parse and
//! classification failures escape as `Err`.
//!
//! The client is `Send + Sync` and holds no per-call state, so one instance
//! can serve concurrent calls. Each call blocks only on its own I/O and, when
//! polling, on its own sleeps.

use std::error::Error;
use std::fmt;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, NoProxy, Proxy};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::classify::{ContentClass, RawResponse, ResponseModel, is_http_success, parse_data, validate};
use crate::config::ClientConfig;
use crate::error::Tmv1Error;
use crate::multi_status::MultiResponse;
use crate::pagination::{ConsumeSummary, Linkable, resolve_next_link};
use crate::poll::{PollConfig, poll_status};
use crate::request::{ApiRequest, MultipartForm, Payload};
use crate::result::{ApiResult, ErrorDetail, MultiApiResult, MultiStatusError};
use crate::sandbox::SandboxSubmissionStatus;
use crate::task::StatusResource;

/// Error type a pagination consumer may return to stop consumption.
pub type ConsumerError = Box<dyn Error + Send + Sync>;

/// Builds the underlying `reqwest::Client` from the configuration.
///
/// System proxy detection is disabled; only the proxies recorded in
/// [`ClientConfig::proxy`] are applied.
fn build_http_client(config: &ClientConfig) -> crate::error::Result<Client> {
    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .no_proxy();

    let proxy = &config.proxy;
    let bypass = || proxy.no_proxy.as_deref().and_then(NoProxy::from_string);
    if let Some(http) = &proxy.http {
        let p = Proxy::http(http)
            .map_err(|e| Tmv1Error::config(format!("invalid HTTP proxy '{http}': {e}")))?;
        builder = builder.proxy(p.no_proxy(bypass()));
    }
    if let Some(https) = &proxy.https {
        let p = Proxy::https(https)
            .map_err(|e| Tmv1Error::config(format!("invalid HTTPS proxy '{https}': {e}")))?;
        builder = builder.proxy(p.no_proxy(bypass()));
    }
    if !proxy.is_empty() {
        debug!(http = ?proxy.http, https = ?proxy.https, no_proxy = ?proxy.no_proxy, "using proxies");
    }

    Ok(builder.build()?)
}

fn fixed_headers(config: &ClientConfig) -> crate::error::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
        .map_err(|_| Tmv1Error::config("API token contains characters not allowed in a header"))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    let user_agent = HeaderValue::from_str(&config.user_agent())
        .map_err(|_| Tmv1Error::config("application name contains characters not allowed in a header"))?;
    headers.insert(USER_AGENT, user_agent);
    Ok(headers)
}

/// Typed client for the Vision One REST API.
pub struct Tmv1Client {
    http: Client,
    base_url: Url,
    headers: HeaderMap,
    max_pages: Option<usize>,
}

impl fmt::Debug for Tmv1Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tmv1Client")
            .field("base_url", &self.base_url.as_str())
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

impl Tmv1Client {
    /// Builds a client from its configuration.
    ///
    /// # Errors
    ///
    /// - `Tmv1Error::Config` — invalid base URL, token, application name or
    ///   proxy URL.
    /// - `Tmv1Error::Network` — the HTTP client could not be initialised.
    pub fn new(config: &ClientConfig) -> crate::error::Result<Self> {
        let base_url = config.base_url()?;
        let client = Tmv1Client {
            http: build_http_client(config)?,
            headers: fixed_headers(config)?,
            base_url,
            max_pages: config.max_pages,
        };
        debug!(base_url = %client.base_url, "client created");
        Ok(client)
    }

    /// The versioned base URL every request path is appended to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Public operations ────────────────────────────────────────────

    /// Sends a single-resource request and parses the response into `T`.
    ///
    /// A failing multi-status response is reported through its first
    /// failing item.
    ///
    /// # Errors
    ///
    /// `Network`, `Parse`, `ParseModel` and `Config` escape as `Err`; server
    /// errors become `ApiResult::Failure`.
    pub async fn send<T: ResponseModel>(
        &self,
        request: ApiRequest,
    ) -> crate::error::Result<ApiResult<T>> {
        recover(self.process(request).await)
    }

    /// Sends a batch request (always as `POST`) whose answer is a
    /// multi-status array.
    ///
    /// The call succeeds only when every item succeeded. Otherwise the
    /// failure lists one error per item in submission order; a single
    /// top-level HTTP error becomes a one-element list.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_multi<T: DeserializeOwned>(
        &self,
        mut request: ApiRequest,
    ) -> crate::error::Result<MultiApiResult<MultiResponse<T>>> {
        request.method = Method::POST;
        match self.process(request).await {
            Ok(response) => Ok(MultiApiResult::success(response)),
            Err(Tmv1Error::Server(detail)) => {
                MultiApiResult::failure(vec![MultiStatusError::from(detail)])
            }
            Err(Tmv1Error::MultiStatus(errors)) => MultiApiResult::failure(errors),
            Err(err) => Err(err),
        }
    }

    /// Fetches every page of a list endpoint and hands each record to
    /// `consumer`, in order.
    ///
    /// Later pages are requested from the `nextLink` path and query with the
    /// same extra headers as the first request; the first request's own query
    /// parameters are not re-sent. When the configured page ceiling is
    /// reached, consumption stops with a warning and the summary is marked
    /// truncated.
    ///
    /// # Errors
    ///
    /// - `Tmv1Error::Consumer` — the consumer returned an error; pagination
    ///   stops at that record.
    /// - `Tmv1Error::Config` — a `nextLink` that is not a valid URL.
    /// - Otherwise as [`send`](Self::send). A server error on any page
    ///   becomes `ApiResult::Failure`; records already consumed stay consumed.
    pub async fn send_linkable<P, F>(
        &self,
        request: ApiRequest,
        consumer: F,
    ) -> crate::error::Result<ApiResult<ConsumeSummary>>
    where
        P: Linkable,
        F: FnMut(P::Item) -> Result<(), ConsumerError>,
    {
        recover(self.consume_pages::<P, F>(request, consumer).await)
    }

    /// Sends a request for a status resource, optionally polling it until it
    /// reaches a terminal status.
    ///
    /// On poll timeout the last fetched state is returned as a success.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_polled<T: ResponseModel + StatusResource>(
        &self,
        request: ApiRequest,
        poll: Option<&PollConfig>,
    ) -> crate::error::Result<ApiResult<T>> {
        let Some(config) = poll else {
            return self.send(request).await;
        };
        let polled = poll_status(|| self.process::<T>(request.clone()), config).await;
        recover(polled.map(|p| p.resource))
    }

    /// Fetches a response task at `/response/tasks/{task_id}`.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_task_result<T: ResponseModel + StatusResource>(
        &self,
        task_id: &str,
        poll: Option<&PollConfig>,
    ) -> crate::error::Result<ApiResult<T>> {
        self.send_polled(ApiRequest::get(format!("/response/tasks/{task_id}")), poll)
            .await
    }

    /// Fetches a sandbox artifact at `artifact_path`, first polling the
    /// submission at `/sandbox/tasks/{submit_id}` when `poll` is set.
    ///
    /// A server error while polling is returned without fetching the
    /// artifact.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_sandbox_result<T: ResponseModel>(
        &self,
        artifact_path: &str,
        submit_id: &str,
        poll: Option<&PollConfig>,
    ) -> crate::error::Result<ApiResult<T>> {
        if poll.is_some() {
            let status: ApiResult<SandboxSubmissionStatus> = self
                .send_polled(ApiRequest::get(format!("/sandbox/tasks/{submit_id}")), poll)
                .await?;
            if let ApiResult::Failure(error) = status {
                return Ok(ApiResult::Failure(error));
            }
        }
        self.send(ApiRequest::get(artifact_path)).await
    }

    // ── Pipeline ─────────────────────────────────────────────────────

    async fn consume_pages<P, F>(
        &self,
        request: ApiRequest,
        mut consumer: F,
    ) -> crate::error::Result<ConsumeSummary>
    where
        P: Linkable,
        F: FnMut(P::Item) -> Result<(), ConsumerError>,
    {
        let headers = request.headers.clone();
        let mut summary = ConsumeSummary::default();
        let mut next = Some(request);

        while let Some(request) = next.take() {
            let page: P = self.process(request).await?;
            summary.pages += 1;

            let (items, link) = page.into_parts();
            for item in items {
                consumer(item).map_err(Tmv1Error::Consumer)?;
                summary.total_consumed += 1;
            }

            let Some(link) = link else { break };
            if self.max_pages.is_some_and(|max| summary.pages >= max) {
                warn!(
                    pages = summary.pages,
                    consumed = summary.total_consumed,
                    "page ceiling reached, stopping pagination"
                );
                summary.truncated = true;
                break;
            }

            let page = resolve_next_link(&link, &self.base_url)?;
            debug!(next = %page.path_and_query(), "following nextLink");
            let mut request = ApiRequest::get(page.path_and_query());
            request.headers = headers.clone();
            next = Some(request);
        }

        debug!(
            total = summary.total_consumed,
            pages = summary.pages,
            model = std::any::type_name::<P>(),
            "records consumed"
        );
        Ok(summary)
    }

    async fn process<T: ResponseModel>(&self, request: ApiRequest) -> crate::error::Result<T> {
        debug!(
            method = %request.method,
            path = %request.path,
            model = std::any::type_name::<T>(),
            "processing request"
        );
        let raw = self.send_internal(request).await?;
        validate(&raw)?;
        parse_data(&raw)
    }

    async fn send_internal(&self, request: ApiRequest) -> crate::error::Result<RawResponse> {
        let url = self.url_for(&request.path);
        let headers = self.merge_headers(&request.headers)?;
        let body_log = request.body.as_ref().map(Payload::describe);

        info!(
            method = %request.method,
            url = %url,
            headers = %masked(&headers),
            body = body_log.as_deref().unwrap_or(""),
            "sending request"
        );

        let mut builder = self.http.request(request.method, url).headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            Some(Payload::Json(value)) => builder.json(&value),
            Some(Payload::Multipart(form)) => builder.multipart(to_form(form)?),
            None => builder,
        };

        let raw = RawResponse::read(builder.send().await?).await?;
        info!(
            status = raw.status.as_u16(),
            headers = %masked(&raw.headers),
            body = %describe_body(&raw),
            "received response"
        );
        Ok(raw)
    }

    fn url_for(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Fixed headers first, then the request's own headers on top.
    fn merge_headers(&self, extra: &[(String, String)]) -> crate::error::Result<HeaderMap> {
        let mut headers = self.headers.clone();
        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Tmv1Error::config(format!("invalid header name '{name}'")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Tmv1Error::config(format!("invalid value for header '{name}'")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Converts recoverable server failures into an `ApiResult`.
fn recover<T>(outcome: crate::error::Result<T>) -> crate::error::Result<ApiResult<T>> {
    match outcome {
        Ok(value) => Ok(ApiResult::success(value)),
        Err(Tmv1Error::Server(detail)) => Ok(ApiResult::failure(detail)),
        Err(Tmv1Error::MultiStatus(errors)) => first_failure(&errors)
            .map(ApiResult::failure)
            .ok_or_else(|| Tmv1Error::Internal("multi-status failure without items".to_string())),
        Err(err) => Err(err),
    }
}

fn first_failure(errors: &[MultiStatusError]) -> Option<ErrorDetail> {
    errors
        .iter()
        .find(|e| !is_http_success([e.status]))
        .or_else(|| errors.first())
        .map(MultiStatusError::detail)
}

fn to_form(form: MultipartForm) -> crate::error::Result<Form> {
    let mut out = Form::new();
    for (name, value) in form.fields {
        out = out.text(name, value);
    }
    if let Some(file) = form.file {
        let part = Part::bytes(file.content.to_vec())
            .file_name(file.file_name)
            .mime_str(&file.mime)?;
        out = out.part(file.field, part);
    }
    Ok(out)
}

fn masked(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name == AUTHORIZATION {
                "Bearer *****"
            } else {
                value.to_str().unwrap_or("<non-ascii>")
            };
            format!("{name}: {value}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_body(raw: &RawResponse) -> String {
    match raw.content_class() {
        ContentClass::Json | ContentClass::Text => raw.text(),
        _ if raw.body.is_empty() => String::new(),
        _ => format!("<binary {} bytes>", raw.body.len()),
    }
}
