//! Linkable list pages and `nextLink` resolution.
//!
//! List endpoints return a page of `items` and, when more records exist, a
//! `nextLink` URL. The next page is requested from the path and query of
//! that link, taken relative to the versioned base URL; the query string is
//! forwarded verbatim so server-issued continuation tokens survive intact.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::classify::{Decoded, ModelError, ResponseModel, ResponseShape};
use crate::error::Tmv1Error;

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct LinkablePage<T> {
    /// Records of this page; a `null` or missing list reads as empty.
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub items: Vec<T>,
    /// Absolute URL of the next page, absent on the last page.
    #[serde(default)]
    pub next_link: Option<String>,
    /// Total number of matching records, when the endpoint reports it.
    #[serde(default)]
    pub total_count: Option<u64>,
    /// Number of records on this page, when the endpoint reports it.
    #[serde(default)]
    pub count: Option<u64>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl<T: DeserializeOwned> ResponseModel for LinkablePage<T> {
    const SHAPE: ResponseShape = ResponseShape::Json;

    fn from_decoded(decoded: Decoded) -> Result<Self, ModelError> {
        decoded.json()
    }
}

/// A response model that yields records and an optional next-page link.
pub trait Linkable: ResponseModel {
    /// Record type delivered to the consumer.
    type Item;

    /// Splits the page into its records and its `nextLink`.
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

impl<T: DeserializeOwned> Linkable for LinkablePage<T> {
    type Item = T;

    fn into_parts(self) -> (Vec<T>, Option<String>) {
        (self.items, self.next_link)
    }
}

/// Outcome of consuming a paginated collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumeSummary {
    /// Records delivered to the consumer across all pages.
    pub total_consumed: usize,
    /// Pages fetched.
    pub pages: usize,
    /// `true` when the page ceiling stopped pagination before the last page.
    pub truncated: bool,
}

/// Path and raw query of a next-page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPage {
    /// Path relative to the versioned base URL, starting with `/`.
    pub path: String,
    /// Query string exactly as issued by the server.
    pub query: Option<String>,
}

impl NextPage {
    /// `path?query`, or just the path when there is no query.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }
}

/// Resolves a `nextLink` against the versioned base URL.
///
/// Relative links are joined onto the base. The base path prefix (for
/// example `/v3.0`) is stripped so the result can be appended to the base
/// like any other request path.
///
/// # Errors
///
/// `Tmv1Error::Config` when the link cannot be parsed as a URL.
pub fn resolve_next_link(link: &str, base: &Url) -> crate::error::Result<NextPage> {
    let url = base
        .join(link)
        .map_err(|e| Tmv1Error::config(format!("invalid nextLink '{link}': {e}")))?;
    let prefix = base.path().trim_end_matches('/');
    let path = url.path();
    let relative = match path.strip_prefix(prefix) {
        Some(rest) if prefix.is_empty() || rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };
    let relative = if relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("/{relative}")
    };
    Ok(NextPage {
        path: relative,
        query: url.query().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://api.xdr.trendmicro.com/v3.0").unwrap()
    }

    #[test]
    fn null_items_read_as_empty() {
        let page: LinkablePage<u32> = serde_json::from_str(r#"{"items": null}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_link.is_none());
    }

    #[test]
    fn missing_items_read_as_empty() {
        let page: LinkablePage<u32> = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.count, Some(0));
    }

    #[test]
    fn into_parts_returns_items_and_link() {
        let page: LinkablePage<u32> = serde_json::from_str(
            r#"{"items": [1, 2], "nextLink": "https://h/v3.0/x?skipToken=a"}"#,
        )
        .unwrap();
        let (items, link) = page.into_parts();
        assert_eq!(items, [1, 2]);
        assert_eq!(link.as_deref(), Some("https://h/v3.0/x?skipToken=a"));
    }

    #[test]
    fn absolute_link_strips_version_prefix() {
        let next = resolve_next_link(
            "https://api.xdr.trendmicro.com/v3.0/oat/detections?skipToken=abc%3D%3D&top=50",
            &base(),
        )
        .unwrap();
        assert_eq!(next.path, "/oat/detections");
        assert_eq!(next.query.as_deref(), Some("skipToken=abc%3D%3D&top=50"));
        assert_eq!(
            next.path_and_query(),
            "/oat/detections?skipToken=abc%3D%3D&top=50"
        );
    }

    #[test]
    fn relative_link_is_joined_onto_base() {
        let next = resolve_next_link("/v3.0/workbench/alerts?skipToken=1", &base()).unwrap();
        assert_eq!(next.path, "/workbench/alerts");
        assert_eq!(next.query.as_deref(), Some("skipToken=1"));
    }

    #[test]
    fn link_without_query() {
        let next = resolve_next_link("https://h/v3.0/iam/apiKeys", &base()).unwrap();
        assert_eq!(next.path_and_query(), "/iam/apiKeys");
    }

    #[test]
    fn link_outside_base_keeps_full_path() {
        let next = resolve_next_link("https://h/v3.01/things", &base()).unwrap();
        assert_eq!(next.path, "/v3.01/things");
    }

    #[test]
    fn base_with_custom_prefix() {
        let base = Url::parse("http://127.0.0.1:8080/v3.0").unwrap();
        let next = resolve_next_link("http://127.0.0.1:8080/v3.0/eiqs/endpoints?skipToken=2", &base)
            .unwrap();
        assert_eq!(next.path_and_query(), "/eiqs/endpoints?skipToken=2");
    }
}
