//! Key-set sources
//!
//! The cache only needs "perform a GET, hand back status and body". That
//! capability is the [`KeySetSource`] trait; [`HttpKeySetSource`] is the
//! reqwest implementation that talks to `{base}/.well-known/jwks.json`.
//!
//! # Security
//!
//! - HTTPS is required, plain HTTP is accepted for loopback hosts only
//! - Redirects are not followed
//! - Every request carries a timeout

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};
use url::{Host, Url};

use crate::error::FetchError;

/// Fixed path of the published key set, relative to the signer's base URL.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Raw answer from a key-set source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl SourceResponse {
    /// Create a response from a status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Something that can retrieve the published key set.
///
/// Implementations perform exactly one request per call; retries, pooling and
/// TLS configuration belong to the implementation, not to the cache.
#[async_trait]
pub trait KeySetSource: Send + Sync + fmt::Debug {
    /// Perform the GET and return status and body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when the request could not be made.
    async fn get(&self) -> Result<SourceResponse, FetchError>;

    /// Human-readable location, used in logs.
    fn endpoint(&self) -> &str;
}

/// Configuration for [`HttpKeySetSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSourceConfig {
    /// Signer base URL; the well-known path is appended
    pub base_url: String,
    /// Per-request timeout (default: 5 seconds)
    pub timeout: Duration,
    /// Reuse connections between fetches (default: true)
    pub keep_alive: bool,
    /// User agent for key-set requests
    pub user_agent: String,
}

impl HttpSourceConfig {
    /// Default settings for a signer base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(5),
            keep_alive: true,
            user_agent: format!("turbojwt/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable connection reuse.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

/// Fetches the key set over HTTPS with reqwest.
#[derive(Clone)]
pub struct HttpKeySetSource {
    url: String,
    client: reqwest::Client,
}

impl HttpKeySetSource {
    /// Create a source for `{base_url}/.well-known/jwks.json` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidEndpoint`] if the URL is unusable.
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_config(HttpSourceConfig::new(base_url))
    }

    /// Create a source from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidEndpoint`] if the URL does not parse, is not
    /// HTTPS (plain HTTP is allowed for loopback hosts), or the HTTP client
    /// cannot be built.
    pub fn with_config(config: HttpSourceConfig) -> Result<Self, FetchError> {
        let url = jwks_url(&config.base_url)?;

        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout)
            .user_agent(config.user_agent);
        if !config.keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::InvalidEndpoint(format!("HTTP client: {e}")))?;

        Ok(Self { url, client })
    }

    /// Create a source reusing an existing client.
    ///
    /// The client should not follow redirects.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidEndpoint`] if the URL is unusable.
    pub fn from_client(
        base_url: impl AsRef<str>,
        client: reqwest::Client,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            url: jwks_url(base_url.as_ref())?,
            client,
        })
    }

    /// Full key-set URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for HttpKeySetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpKeySetSource")
            .field("url", &self.url)
            .field("client", &"<reqwest::Client>")
            .finish()
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn get(&self) -> Result<SourceResponse, FetchError> {
        debug!(jwks_url = %self.url, "Requesting JWKS");

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            error!(jwks_url = %self.url, error = %e, "Failed to fetch JWKS");
            FetchError::Transport(e.to_string())
        })?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            error!(jwks_url = %self.url, error = %e, "Failed to read JWKS body");
            FetchError::Transport(e.to_string())
        })?;

        Ok(SourceResponse::new(status, body.to_vec()))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// Build the key-set URL from a signer base URL and check its scheme.
fn jwks_url(base_url: &str) -> Result<String, FetchError> {
    let parsed = Url::parse(base_url)
        .map_err(|e| FetchError::InvalidEndpoint(format!("invalid URL {base_url:?}: {e}")))?;

    let secure = match parsed.scheme() {
        "https" => true,
        "http" => is_loopback(&parsed),
        _ => false,
    };
    if !secure {
        return Err(FetchError::InvalidEndpoint(
            "JWKS endpoint must use HTTPS (HTTP only allowed for loopback hosts)".to_string(),
        ));
    }

    Ok(format!("{}{}", base_url.trim_end_matches('/'), JWKS_PATH))
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
