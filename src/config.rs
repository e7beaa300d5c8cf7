//! Client configuration.
//!
//! [`ClientConfig`] carries everything needed to build a
//! [`Tmv1Client`](crate::client::Tmv1Client): identity (application name and
//! API token), the regional base URL, HTTP timeouts, connection pooling, the
//! optional pagination ceiling and proxy settings. It is `Clone + PartialEq`
//! so the [`registry`](crate::registry) can tell whether a cached client is
//! still valid.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::Tmv1Error;

/// Version segment appended to the base URL.
pub const API_VERSION: &str = "v3.0";

/// Suffix of the `User-Agent` header, after the application name.
pub const USER_AGENT_SUFFIX: &str = "tmv1-rs";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 1;

/// Proxy URLs read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    /// Proxy for `http://` targets.
    pub http: Option<String>,
    /// Proxy for `https://` targets.
    pub https: Option<String>,
    /// Comma-separated hosts that bypass the proxies.
    pub no_proxy: Option<String>,
}

impl ProxySettings {
    /// Reads `HTTP_PROXY`, `HTTPS_PROXY` and `NO_PROXY` (falling back to the
    /// lowercase names). Empty values count as unset.
    pub fn from_env() -> Self {
        ProxySettings {
            http: env_var("HTTP_PROXY"),
            https: env_var("HTTPS_PROXY"),
            no_proxy: env_var("NO_PROXY"),
        }
    }

    /// `true` when no proxy is configured.
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .or_else(|_| std::env::var(name.to_ascii_lowercase()))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Settings used to build a client.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Application name, prefixed to the `User-Agent`.
    pub app_name: String,
    /// API token sent as `Authorization: Bearer <token>`.
    pub token: String,
    /// Regional API URL without the version segment,
    /// e.g. `https://api.xdr.trendmicro.com`.
    pub url: String,
    pub connect_timeout: Duration,
    /// Applies to each read of the response.
    pub read_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    /// Page ceiling for linkable consumption; `None` follows every link.
    pub max_pages: Option<usize>,
    pub proxy: ProxySettings,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("app_name", &self.app_name)
            .field("token", &"[REDACTED]")
            .field("url", &self.url)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("max_pages", &self.max_pages)
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration with default timeouts and proxies from the
    /// environment.
    pub fn new(app_name: impl Into<String>, token: impl Into<String>, url: impl Into<String>) -> Self {
        ClientConfig {
            app_name: app_name.into(),
            token: token.into(),
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            max_pages: None,
            proxy: ProxySettings::from_env(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_pool_max_idle_per_host(mut self, size: usize) -> Self {
        self.pool_max_idle_per_host = size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = proxy;
        self
    }

    /// The versioned base URL: `url`, a `/` if missing, then `v3.0`.
    ///
    /// # Errors
    ///
    /// `Tmv1Error::Config` when the URL does not parse or is not http(s).
    pub fn base_url(&self) -> crate::error::Result<Url> {
        let mut raw = self.url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        raw.push_str(API_VERSION);
        let url = Url::parse(&raw)
            .map_err(|e| Tmv1Error::config(format!("invalid base URL '{}': {e}", self.url)))?;
        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(url),
            scheme => Err(Tmv1Error::config(format!(
                "base URL must be http(s) with a host, got scheme '{scheme}'"
            ))),
        }
    }

    /// `<app_name>-tmv1-rs/<crate version>`.
    pub fn user_agent(&self) -> String {
        format!(
            "{}-{}/{}",
            self.app_name,
            USER_AGENT_SUFFIX,
            env!("CARGO_PKG_VERSION")
        )
    }
}
