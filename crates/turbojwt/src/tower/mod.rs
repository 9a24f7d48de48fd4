//! # Tower middleware for bearer-token verification
//!
//! [`JwtAuthLayer`] wraps an HTTP service with [`JwtAuthService`], which:
//!
//! - extracts `Authorization: Bearer <token>` (header name configurable)
//! - verifies the token with a [`JwtVerifier`](crate::JwtVerifier)
//! - on success inserts the verified [`TokenClaims`](crate::TokenClaims)
//!   into the request extensions and calls the inner service
//! - on failure answers directly with 401 or 403 and a JSON body
//!   `{"error": "<reason>"}`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use turbojwt::tower::JwtAuthLayer;
//!
//! let verifier = JwtAuthConfig::from_env()?.build_verifier()?;
//!
//! // Any authenticated caller
//! let api = ServiceBuilder::new()
//!     .layer(JwtAuthLayer::new(verifier.clone()))
//!     .service(api_handler);
//!
//! // Billing routes additionally need the `billing` group
//! let billing = ServiceBuilder::new()
//!     .layer(JwtAuthLayer::new(verifier).require_roles("billing".parse()?))
//!     .service(billing_handler);
//! ```
//!
//! In a handler:
//!
//! ```rust,ignore
//! if let Some(claims) = req.extensions().get::<TokenClaims>() {
//!     println!("caller roles: {:?}", claims.roles);
//! }
//! ```

mod layer;
mod service;

pub use layer::JwtAuthLayer;
pub use service::{JwtAuthService, JwtAuthServiceFuture, bearer_token, error_response};

/// Configuration for the JWT layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtLayerConfig {
    /// Header carrying the bearer token (default: "Authorization")
    pub auth_header: String,
    /// Request paths forwarded without a token (e.g. "/health")
    pub bypass_paths: Vec<String>,
    /// Forward every request untouched, for local development
    pub pass_through: bool,
}

impl Default for JwtLayerConfig {
    fn default() -> Self {
        Self {
            auth_header: http::header::AUTHORIZATION.as_str().to_string(),
            bypass_paths: Vec::new(),
            pass_through: false,
        }
    }
}

impl JwtLayerConfig {
    /// A config that skips verification entirely
    #[must_use]
    pub fn pass_through() -> Self {
        Self {
            pass_through: true,
            ..Default::default()
        }
    }

    /// Add a path to the bypass list
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.bypass_paths.push(path.into());
        self
    }

    /// Set the header name to read the token from
    #[must_use]
    pub fn auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self
    }

    /// Check if a request path skips verification
    #[must_use]
    pub fn should_bypass(&self, path: &str) -> bool {
        self.pass_through || self.bypass_paths.iter().any(|p| p == path)
    }
}
