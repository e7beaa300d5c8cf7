//! Response shape classification and HTTP-level validation.
//!
//! The Vision One API answers with several body shapes: plain JSON resources,
//! multi-status arrays, `201 Created` responses that only carry a `Location`
//! header, empty `204` responses, plain text, binary downloads and task
//! results whose concrete shape depends on an `action` discriminator.
//!
//! Every response model declares the shape it expects through
//! [`ResponseModel::SHAPE`]. [`parse_data`] then picks a decoding strategy
//! from a fixed table keyed by `(status, content class, expected shape)`:
//!
//! | Status | Content class | Expected shape | Strategy |
//! |--------|---------------|----------------|----------|
//! | 201 | any | any | headers |
//! | 204 | any | `NoContent` | empty |
//! | 204 | any | other | *no match* |
//! | any | text | `Text` | text |
//! | any | json / text | JSON-backed shapes | json |
//! | any | binary | `Bytes` | bytes |
//! | otherwise | | | *no match* |
//!
//! A missing rule yields [`Tmv1Error::ParseModel`] naming the expected type
//! and echoing the raw response.

use std::fmt;
use std::sync::LazyLock;

use bytes::Bytes;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, ETAG, HeaderMap, LOCATION};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::Tmv1Error;
use crate::multi_status;
use crate::result::ErrorDetail;

// ── Raw response ─────────────────────────────────────────────────────

/// A fully-read HTTP response: status, headers and body bytes.
#[derive(Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Exact body bytes, never decompressed.
    pub body: Bytes,
}

impl RawResponse {
    /// Builds a response from its parts.
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers,
            body: body.into(),
        }
    }

    /// Reads the whole body of a `reqwest` response.
    pub async fn read(response: reqwest::Response) -> crate::error::Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Value of a header as a string, if present and valid ASCII.
    pub fn header(&self, name: impl reqwest::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Content-Type` header, empty when absent.
    pub fn content_type(&self) -> &str {
        self.header(CONTENT_TYPE).unwrap_or_default()
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Classifies the body from `Content-Type` and `Content-Encoding`.
    pub fn content_class(&self) -> ContentClass {
        ContentClass::of(self.content_type(), self.header(CONTENT_ENCODING))
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type())
            .field("body_len", &self.body.len())
            .finish()
    }
}

// ── Classification ───────────────────────────────────────────────────

/// Coarse class of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// `Content-Type` mentions `json`.
    Json,
    /// `Content-Type` mentions `text` (and not `json`).
    Text,
    /// Any other `application/*` type, or a gzip `Content-Encoding`.
    Binary,
    /// Missing or unrecognised content type.
    Other,
}

impl ContentClass {
    /// Classifies a body from its content type and encoding.
    pub fn of(content_type: &str, content_encoding: Option<&str>) -> Self {
        if content_type.contains("json") {
            ContentClass::Json
        } else if content_type.contains("text") {
            ContentClass::Text
        } else if content_type.contains("application") || content_encoding == Some("gzip") {
            ContentClass::Binary
        } else {
            ContentClass::Other
        }
    }
}

/// Response shape a model expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Built from the headers of a `201 Created` response.
    Created,
    /// Empty body of a `204 No Content` response.
    NoContent,
    /// Body kept verbatim as text.
    Text,
    /// Body kept verbatim as bytes.
    Bytes,
    /// JSON array of multi-status items.
    MultiStatus,
    /// Whole JSON body wrapped as a package.
    Package,
    /// JSON entity plus the `ETag` response header.
    EntityWithEtag,
    /// JSON task result, refined by its `action` discriminator.
    TaskResult,
    /// Plain JSON object.
    Json,
}

/// Decoding strategy selected for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Construct from response headers.
    Headers,
    /// Construct the empty-body marker.
    Empty,
    /// Copy the body as text.
    Text,
    /// Parse the body as JSON.
    Json,
    /// Copy the body as bytes.
    Bytes,
}

/// Picks the decoding strategy, or `None` when no rule matches.
pub fn select_strategy(status: u16, content: ContentClass, shape: ResponseShape) -> Option<Strategy> {
    use ContentClass as C;
    use ResponseShape as S;

    match (status, content, shape) {
        (201, _, _) => Some(Strategy::Headers),
        (204, _, S::NoContent) => Some(Strategy::Empty),
        (204, _, _) => None,
        (_, C::Text, S::Text) => Some(Strategy::Text),
        (
            _,
            C::Json | C::Text,
            S::MultiStatus | S::Package | S::EntityWithEtag | S::TaskResult | S::Json,
        ) => Some(Strategy::Json),
        (_, C::Binary, S::Bytes) => Some(Strategy::Bytes),
        _ => None,
    }
}

// ── Models ───────────────────────────────────────────────────────────

/// Intermediate representation handed to [`ResponseModel::from_decoded`].
#[derive(Debug, Clone)]
pub enum Decoded {
    /// Headers of a `201 Created` response.
    Headers(HeaderMap),
    /// A `204 No Content` response.
    NoContent,
    /// Verbatim text body.
    Text(String),
    /// Verbatim body bytes.
    Bytes(Bytes),
    /// Multi-status array elements.
    Items(Vec<Value>),
    /// A body to wrap as a package.
    Package(Value),
    /// An entity body and its `ETag` header (empty when absent).
    Tagged {
        /// The entity body.
        entity: Value,
        /// The `ETag` response header.
        etag: String,
    },
    /// A task result body and its `action` discriminator.
    Task {
        /// Value of the body's `action` field, if present.
        action: Option<String>,
        /// The full body.
        body: Value,
    },
    /// A plain JSON body.
    Json(Value),
}

impl Decoded {
    /// Deserializes a plain JSON body.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ModelError> {
        match self {
            Decoded::Json(value) => Ok(serde_json::from_value(value)?),
            _ => Err(ModelError::Unsupported),
        }
    }
}

/// Why a model could not be built from a decoded response.
#[derive(Debug)]
pub enum ModelError {
    /// The decoded shape does not fit this model.
    Unsupported,
    /// The JSON body does not deserialize into this model.
    Json(serde_json::Error),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Json(err)
    }
}

/// A type the dispatcher can produce from a raw response.
pub trait ResponseModel: Sized {
    /// Shape this model expects from the API.
    const SHAPE: ResponseShape;

    /// Builds the model from the classifier's decoded response.
    fn from_decoded(decoded: Decoded) -> Result<Self, ModelError>;
}

/// Implements [`ResponseModel`] with [`ResponseShape::Json`] for plain
/// `Deserialize` types.
macro_rules! json_model {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::classify::ResponseModel for $ty {
                const SHAPE: $crate::classify::ResponseShape = $crate::classify::ResponseShape::Json;

                fn from_decoded(
                    decoded: $crate::classify::Decoded,
                ) -> ::std::result::Result<Self, $crate::classify::ModelError> {
                    decoded.json()
                }
            }
        )+
    };
}
pub(crate) use json_model;

json_model!(Value);

/// Marker for endpoints answering `204 No Content`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoContentResp;

impl ResponseModel for NoContentResp {
    const SHAPE: ResponseShape = ResponseShape::NoContent;

    fn from_decoded(decoded: Decoded) -> Result<Self, ModelError> {
        match decoded {
            Decoded::NoContent => Ok(NoContentResp),
            _ => Err(ModelError::Unsupported),
        }
    }
}

/// A plain-text body, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResp {
    /// The response body.
    pub text: String,
}

impl ResponseModel for TextResp {
    const SHAPE: ResponseShape = ResponseShape::Text;

    fn from_decoded(decoded: Decoded) -> Result<Self, ModelError> {
        match decoded {
            Decoded::Text(text) => Ok(TextResp { text }),
            _ => Err(ModelError::Unsupported),
        }
    }
}

/// A binary body (PDF report, zip package), kept as the exact bytes received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesResp {
    /// The response body.
    pub content: Bytes,
}

impl ResponseModel for BytesResp {
    const SHAPE: ResponseShape = ResponseShape::Bytes;

    fn from_decoded(decoded: Decoded) -> Result<Self, ModelError> {
        match decoded {
            Decoded::Bytes(content) => Ok(BytesResp { content }),
            _ => Err(ModelError::Unsupported),
        }
    }
}

/// Identifier of a resource created by a `201 Created` response.
///
/// The id is the final `/`-delimited segment of the `Location` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedResp {
    /// The created resource's identifier.
    pub id: String,
    /// The full `Location` header.
    pub location: String,
}

impl ResponseModel for CreatedResp {
    const SHAPE: ResponseShape = ResponseShape::Created;

    fn from_decoded(decoded: Decoded) -> Result<Self, ModelError> {
        let Decoded::Headers(headers) = decoded else {
            return Err(ModelError::Unsupported);
        };
        let location = headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ModelError::Unsupported)?;
        let id = location.rsplit('/').next().unwrap_or_default();
        Ok(CreatedResp {
            id: id.to_string(),
            location: location.to_string(),
        })
    }
}

/// A whole JSON body wrapped as a downloaded package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageResp<T> {
    /// The package content.
    pub package: T,
}

impl<T: DeserializeOwned> ResponseModel for PackageResp<T> {
    const SHAPE: ResponseShape = ResponseShape::Package;

    fn from_decoded(decoded: Decoded) -> Result<Self, ModelError> {
        match decoded {
            Decoded::Package(value) => Ok(PackageResp {
                package: serde_json::from_value(value)?,
            }),
            _ => Err(ModelError::Unsupported),
        }
    }
}

/// A JSON entity together with its `ETag`, needed for later `If-Match` updates.
#[derive(Debug, Clone, PartialEq)]
pub struct EtagResp<T> {
    /// The entity.
    pub data: T,
    /// The `ETag` response header, empty when absent.
    pub etag: String,
}

impl<T: DeserializeOwned> ResponseModel for EtagResp<T> {
    const SHAPE: ResponseShape = ResponseShape::EntityWithEtag;

    fn from_decoded(decoded: Decoded) -> Result<Self, ModelError> {
        match decoded {
            Decoded::Tagged { entity, etag } => Ok(EtagResp {
                data: serde_json::from_value(entity)?,
                etag,
            }),
            _ => Err(ModelError::Unsupported),
        }
    }
}

// ── Parsing ──────────────────────────────────────────────────────────

/// Deserializes a validated response into the expected model.
///
/// # Errors
///
/// - `Tmv1Error::ParseModel` — no strategy matches, or the decoded shape
///   does not fit the model.
/// - `Tmv1Error::Parse` — the JSON body does not deserialize.
pub fn parse_data<T: ResponseModel>(raw: &RawResponse) -> crate::error::Result<T> {
    let content = raw.content_class();
    let Some(strategy) = select_strategy(raw.status.as_u16(), content, T::SHAPE) else {
        return Err(parse_model_error::<T>(raw));
    };
    debug!(
        model = std::any::type_name::<T>(),
        ?strategy,
        ?content,
        "parsing response"
    );

    let decoded = match strategy {
        Strategy::Headers => Decoded::Headers(raw.headers.clone()),
        Strategy::Empty => Decoded::NoContent,
        Strategy::Text => Decoded::Text(raw.text()),
        Strategy::Bytes => Decoded::Bytes(raw.body.clone()),
        Strategy::Json => decode_json(raw, T::SHAPE)?,
    };

    T::from_decoded(decoded).map_err(|err| match err {
        ModelError::Unsupported => parse_model_error::<T>(raw),
        ModelError::Json(err) => Tmv1Error::Parse(err),
    })
}

fn decode_json(raw: &RawResponse, shape: ResponseShape) -> crate::error::Result<Decoded> {
    let body: Value = serde_json::from_slice(&raw.body)?;
    Ok(match (shape, body) {
        (ResponseShape::MultiStatus, Value::Array(items)) => Decoded::Items(items),
        (ResponseShape::Package, body) => Decoded::Package(body),
        (ResponseShape::EntityWithEtag, entity) => Decoded::Tagged {
            entity,
            etag: raw.header(ETAG).unwrap_or_default().to_string(),
        },
        (ResponseShape::TaskResult, body) => Decoded::Task {
            action: body.get("action").and_then(Value::as_str).map(str::to_owned),
            body,
        },
        (_, body) => Decoded::Json(body),
    })
}

fn parse_model_error<T>(raw: &RawResponse) -> Tmv1Error {
    Tmv1Error::ParseModel {
        expected: std::any::type_name::<T>(),
        status: raw.status.as_u16(),
        content_type: raw.content_type().to_string(),
        body: raw.text(),
    }
}

// ── Validation ───────────────────────────────────────────────────────

/// `true` when every status lies in `[200, 399)`.
pub fn is_http_success(statuses: impl IntoIterator<Item = u16>) -> bool {
    statuses.into_iter().all(|s| (200..399).contains(&s))
}

/// Rejects HTTP-level failures before classification.
///
/// # Errors
///
/// - `Tmv1Error::Server` — status outside `[200, 399)`.
/// - `Tmv1Error::MultiStatus` — a 207 response with at least one failing item.
/// - `Tmv1Error::Parse` — a 207 body that is not a JSON array.
pub fn validate(raw: &RawResponse) -> crate::error::Result<()> {
    let status = raw.status.as_u16();
    debug!(status, "validating response");
    if !is_http_success([status]) {
        return Err(Tmv1Error::Server(server_error(raw)));
    }
    if status == 207 {
        let items: Vec<Value> = serde_json::from_slice(&raw.body)?;
        if !is_http_success(items.iter().map(multi_status::item_status)) {
            let errors = items
                .into_iter()
                .map(multi_status::parse_error_item)
                .collect::<crate::error::Result<Vec<_>>>()?;
            return Err(Tmv1Error::MultiStatus(errors));
        }
    }
    Ok(())
}

fn server_error(raw: &RawResponse) -> ErrorDetail {
    let status = raw.status.as_u16();
    let content_type = raw.content_type();
    if content_type.contains("application/json") {
        if let Some(detail) = json_error(&raw.body, status) {
            return detail;
        }
    } else if content_type.contains("text/html") {
        return ErrorDetail {
            status,
            message: Some(html_to_text(&raw.text())),
            ..Default::default()
        };
    }
    ErrorDetail {
        status,
        message: Some(raw.text()),
        ..Default::default()
    }
}

fn json_error(body: &[u8], status: u16) -> Option<ErrorDetail> {
    let mut value: Value = serde_json::from_slice(body).ok()?;
    let error = value.get_mut("error")?.take();
    let mut detail: ErrorDetail = serde_json::from_value(error).ok()?;
    detail.status = status;
    Some(detail)
}

static HIDDEN_ELEMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script>|<style\b[^>]*>.*?</style>|<!--.*?-->")
        .expect("valid regex")
});
static BLOCK_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(br|p|div|h[1-6]|li|ul|ol|tr|table|title|head|body|html|hr|center|pre)\b[^>]*>")
        .expect("valid regex")
});
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static ENTITIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[xX]([0-9a-fA-F]{1,6})|#([0-9]{1,7})|([a-zA-Z]+));").expect("valid regex")
});

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "nbsp" => ' ',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "amp" => '&',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "copy" => '\u{a9}',
        _ => return None,
    })
}

/// Decodes numeric and common named character references in one pass.
/// Unknown or invalid references are left as written.
fn decode_entities(text: &str) -> String {
    ENTITIES
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let decoded = if let Some(hex) = caps.get(1) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = caps.get(2) {
                dec.as_str().parse().ok().and_then(char::from_u32)
            } else {
                caps.get(3).and_then(|name| named_entity(name.as_str()))
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Extracts the visible text of an HTML error page, one trimmed non-empty
/// line per text line.
pub fn html_to_text(html: &str) -> String {
    let text = HIDDEN_ELEMENTS.replace_all(html, "");
    let text = BLOCK_TAGS.replace_all(&text, "\n");
    let text = TAGS.replace_all(&text, "");
    let text = decode_entities(&text);
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
