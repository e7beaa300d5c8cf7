//! Request descriptions handed to the dispatcher.
//!
//! An [`ApiRequest`] names the HTTP method, the path relative to the
//! versioned base URL, query parameters, extra headers and an optional
//! payload. The dispatcher adds the fixed `Authorization` / `User-Agent`
//! headers; per-request headers are applied on top and win on conflict.

use std::fmt;

use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;

// ── Payload ──────────────────────────────────────────────────────────

/// A file attached to a multipart form.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name.
    pub field: String,
    /// File name reported to the server.
    pub file_name: String,
    /// MIME type of the part.
    pub mime: String,
    /// File content.
    pub content: Bytes,
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("content", &format_args!("<{} bytes>", self.content.len()))
            .finish()
    }
}

/// A `multipart/form-data` body: text fields plus at most one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Adds a text field when `value` is set and non-empty.
    pub fn text_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value.map(Into::into) {
            Some(value) if !value.is_empty() => self.text(name, value),
            _ => self,
        }
    }

    /// Attaches the file part.
    pub fn file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        self.file = Some(FilePart {
            field: field.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            content: content.into(),
        });
        self
    }
}

/// Multipart text fields whose values never appear in logs.
const SECRET_FIELDS: &[&str] = &["documentPassword", "archivePassword", "arguments"];

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Multipart(MultipartForm),
}

impl Payload {
    /// Loggable rendering of the body. File content is replaced by its size
    /// and password or argument fields are masked.
    pub fn describe(&self) -> String {
        match self {
            Payload::Json(value) => value.to_string(),
            Payload::Multipart(form) => {
                let mut parts: Vec<String> = form
                    .fields
                    .iter()
                    .map(|(name, value)| {
                        if SECRET_FIELDS.contains(&name.as_str()) {
                            format!("{name}=***")
                        } else {
                            format!("{name}={value}")
                        }
                    })
                    .collect();
                if let Some(file) = &form.file {
                    parts.push(format!(
                        "{}=<binary {} bytes: {}>",
                        file.field,
                        file.content.len(),
                        file.file_name
                    ));
                }
                format!("multipart[{}]", parts.join(", "))
            }
        }
    }
}

// ── Request ──────────────────────────────────────────────────────────

/// A request against the Vision One API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the versioned base URL, e.g. `/response/tasks/1`.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Headers applied on top of the client's fixed headers.
    pub headers: Vec<(String, String)>,
    pub body: Option<Payload>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Appends a query parameter when `value` is set.
    pub fn query_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    /// Sets a header, replacing an earlier one with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Sets a header when present; pairs with [`tmv1_filter`] / [`tmv1_query`].
    pub fn header_opt(self, header: Option<(&str, String)>) -> Self {
        match header {
            Some((name, value)) => self.header(name, value),
            None => self,
        }
    }

    /// Sets the `If-Match` header for optimistic concurrency.
    pub fn if_match(self, etag: &str, style: EtagStyle) -> Self {
        self.header("If-Match", format_etag(etag, style))
    }

    /// Sets a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Payload::Json(body));
        self
    }

    /// Sets a multipart body.
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Some(Payload::Multipart(form));
        self
    }
}

// ── ETag ─────────────────────────────────────────────────────────────

/// How an `If-Match` value is written for a resource family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtagStyle {
    /// Wrapped in double quotes (alerts, alert notes).
    Quoted,
    /// Surrounding double quotes removed (API keys, cases, OAT pipelines).
    Bare,
}

/// Normalises an ETag for `If-Match`. Idempotent for both styles.
pub fn format_etag(etag: &str, style: EtagStyle) -> String {
    let bare = etag
        .strip_prefix('"')
        .and_then(|e| e.strip_suffix('"'))
        .unwrap_or(etag);
    match style {
        EtagStyle::Quoted => format!("\"{bare}\""),
        EtagStyle::Bare => bare.to_string(),
    }
}

// ── Filter headers ───────────────────────────────────────────────────

/// Boolean operator joining filter clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    And,
    Or,
}

impl QueryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryOp::And => "and",
            QueryOp::Or => "or",
        }
    }
}

fn build_query(op: QueryOp, fields: &[(&str, &str)]) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    let separator = format!(" {} ", op.as_str());
    Some(
        fields
            .iter()
            .map(|(k, v)| format!("{k} eq '{v}'"))
            .collect::<Vec<_>>()
            .join(&separator),
    )
}

/// `TMV1-Filter` header joining `key eq 'value'` clauses; `None` when
/// `fields` is empty.
pub fn tmv1_filter(op: QueryOp, fields: &[(&str, &str)]) -> Option<(&'static str, String)> {
    build_query(op, fields).map(|q| ("TMV1-Filter", q))
}

/// `TMV1-Query` header joining `key eq 'value'` clauses; `None` when
/// `fields` is empty.
pub fn tmv1_query(op: QueryOp, fields: &[(&str, &str)]) -> Option<(&'static str, String)> {
    build_query(op, fields).map(|q| ("TMV1-Query", q))
}
