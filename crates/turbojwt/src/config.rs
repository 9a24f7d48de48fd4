//! Verifier configuration
//!
//! [`JwtAuthConfig`] describes one signer and the policy its tokens must meet.
//! It can be deserialized from any serde format or read from `JWT_AUTH_*`
//! environment variables:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `JWT_AUTH_JWKS_URL` | signer base URL (required) | |
//! | `JWT_AUTH_ISSUER` | expected `iss` (required) | |
//! | `JWT_AUTH_TOKEN_USE` | `access` or `id` | `access` |
//! | `JWT_AUTH_CLIENT_IDS` | comma-separated accepted client ids | none |
//! | `JWT_AUTH_REQUIRED_ROLES` | `a,b;c` = (a or b) and c | none |
//! | `JWT_AUTH_HTTP_TIMEOUT_SECS` | key-set request timeout | `5` |
//! | `JWT_AUTH_KEEP_ALIVE` | reuse connections (`true`/`false`) | `true` |

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::FetchError;
use crate::jwks::JwksCache;
use crate::jwks::source::HttpSourceConfig;
use crate::jwt::TOKEN_USE_ACCESS;
use crate::policy::{ClaimsPolicy, RoleParseError, RoleRequirement};
use crate::verifier::JwtVerifier;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "JWT_AUTH_";

/// Configuration loading or validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} environment variable not set")]
    Missing(String),

    /// A variable is set but cannot be parsed.
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        /// Variable name
        name: String,
        /// Offending value
        value: String,
        /// What was expected
        reason: String,
    },

    /// The key-set endpoint is unusable.
    #[error(transparent)]
    Endpoint(#[from] FetchError),
}

fn default_token_use() -> String {
    TOKEN_USE_ACCESS.to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_keep_alive() -> bool {
    true
}

/// Signer location plus token policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtAuthConfig {
    /// Signer base URL; keys are read from `{jwks_url}/.well-known/jwks.json`
    pub jwks_url: String,
    /// Expected `iss`
    pub issuer: String,
    /// Expected `token_use`
    #[serde(default = "default_token_use")]
    pub token_use: String,
    /// Accepted client ids
    #[serde(default)]
    pub client_ids: Vec<String>,
    /// Required roles
    #[serde(default)]
    pub required_roles: RoleRequirement,
    /// Key-set request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Reuse connections between key-set fetches
    #[serde(default = "default_keep_alive")]
    pub keep_alive: bool,
}

impl JwtAuthConfig {
    /// Configuration for `jwks_url` and `issuer` with defaults elsewhere.
    pub fn new(jwks_url: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            token_use: default_token_use(),
            client_ids: Vec::new(),
            required_roles: RoleRequirement::new(),
            http_timeout_secs: default_timeout_secs(),
            keep_alive: default_keep_alive(),
        }
    }

    /// Load configuration from `JWT_AUTH_*` environment variables.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use turbojwt::JwtAuthConfig;
    ///
    /// // export JWT_AUTH_JWKS_URL=https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_pool
    /// // export JWT_AUTH_ISSUER=https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_pool
    /// // export JWT_AUTH_CLIENT_IDS=client-1,client-2
    /// let config = JwtAuthConfig::from_env()?;
    /// # Ok::<(), turbojwt::ConfigError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] if `JWT_AUTH_JWKS_URL` or `JWT_AUTH_ISSUER` is
    /// not set, [`ConfigError::Invalid`] if a numeric, boolean or role variable
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`JwtAuthConfig::from_env`].
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            let value = lookup(&name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            (name, value)
        };

        let (name, jwks_url) = var("JWKS_URL");
        let jwks_url = jwks_url.ok_or(ConfigError::Missing(name))?;
        let (name, issuer) = var("ISSUER");
        let issuer = issuer.ok_or(ConfigError::Missing(name))?;

        let mut config = Self::new(jwks_url, issuer);

        if let (_, Some(token_use)) = var("TOKEN_USE") {
            config.token_use = token_use;
        }
        if let (_, Some(ids)) = var("CLIENT_IDS") {
            config.client_ids = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let (name, Some(roles)) = var("REQUIRED_ROLES") {
            config.required_roles = roles.parse().map_err(|e: RoleParseError| {
                ConfigError::Invalid {
                    name,
                    value: roles.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let (name, Some(secs)) = var("HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = secs.parse().map_err(|_| ConfigError::Invalid {
                name,
                value: secs.clone(),
                reason: "expected a whole number of seconds".to_string(),
            })?;
        }
        if let (name, Some(flag)) = var("KEEP_ALIVE") {
            config.keep_alive = parse_bool(&flag).ok_or_else(|| ConfigError::Invalid {
                name,
                value: flag.clone(),
                reason: "expected true or false".to_string(),
            })?;
        }

        Ok(config)
    }

    /// Settings for the HTTP key-set source.
    #[must_use]
    pub fn http_source(&self) -> HttpSourceConfig {
        HttpSourceConfig::new(self.jwks_url.clone())
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .keep_alive(self.keep_alive)
    }

    /// The claims policy described by this configuration.
    #[must_use]
    pub fn policy(&self) -> ClaimsPolicy {
        ClaimsPolicy::new(self.issuer.clone(), self.token_use.clone())
            .client_ids(self.client_ids.iter().cloned())
            .with_roles(self.required_roles.clone())
    }

    /// Build an empty key cache.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Endpoint`] if `jwks_url` is not HTTPS (or loopback HTTP).
    pub fn build_cache(&self) -> Result<JwksCache, ConfigError> {
        Ok(JwksCache::with_http(self.http_source())?)
    }

    /// Build a verifier with an empty key cache; keys are fetched on first use.
    ///
    /// # Errors
    ///
    /// See [`JwtAuthConfig::build_cache`].
    pub fn build_verifier(&self) -> Result<JwtVerifier, ConfigError> {
        Ok(JwtVerifier::new(Arc::new(self.build_cache()?), self.policy()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
