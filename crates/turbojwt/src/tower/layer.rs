//! Tower Layer for JWT verification

use tokio_util::sync::CancellationToken;
use tower::Layer;

use crate::policy::RoleRequirement;
use crate::verifier::JwtVerifier;

use super::JwtLayerConfig;
use super::service::JwtAuthService;

/// Tower Layer that verifies bearer tokens before the inner service runs
///
/// # Example
///
/// ```rust,ignore
/// use tower::ServiceBuilder;
/// use turbojwt::tower::JwtAuthLayer;
///
/// let service = ServiceBuilder::new()
///     .layer(JwtAuthLayer::new(verifier).bypass_path("/health"))
///     .service(my_http_handler);
/// ```
#[derive(Debug, Clone)]
pub struct JwtAuthLayer {
    verifier: JwtVerifier,
    config: JwtLayerConfig,
    shutdown: CancellationToken,
}

impl JwtAuthLayer {
    /// Create a layer with default configuration
    pub fn new(verifier: JwtVerifier) -> Self {
        Self::with_config(verifier, JwtLayerConfig::default())
    }

    /// Create a layer with custom configuration
    pub fn with_config(verifier: JwtVerifier, config: JwtLayerConfig) -> Self {
        Self {
            verifier,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancel in-flight key-set refreshes when `token` is cancelled
    ///
    /// Each request runs with a child of this token.
    #[must_use]
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Replace the required roles for services wrapped by this layer
    #[must_use]
    pub fn require_roles(mut self, roles: RoleRequirement) -> Self {
        self.verifier = self.verifier.with_roles(roles);
        self
    }

    /// Add a path that skips verification
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.config.bypass_paths.push(path.into());
        self
    }

    /// Forward every request without verification
    #[must_use]
    pub fn pass_through(mut self) -> Self {
        self.config.pass_through = true;
        self
    }

    /// The verifier used by this layer
    pub fn verifier(&self) -> &JwtVerifier {
        &self.verifier
    }

    /// The layer configuration
    pub fn config(&self) -> &JwtLayerConfig {
        &self.config
    }
}

impl<S> Layer<S> for JwtAuthLayer {
    type Service = JwtAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JwtAuthService::new(
            inner,
            self.verifier.clone(),
            self.config.clone(),
            self.shutdown.clone(),
        )
    }
}
