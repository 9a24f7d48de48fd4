//! Tower Service that verifies bearer tokens on HTTP requests

use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tower_service::Service;
use tracing::debug;

use crate::error::AuthError;
use crate::verifier::JwtVerifier;

use super::JwtLayerConfig;

/// Tower Service that verifies the request's bearer token
///
/// Verified [`TokenClaims`](crate::TokenClaims) are inserted into the request
/// extensions. Rejections never reach the inner service; they are answered
/// with [`error_response`].
#[derive(Debug, Clone)]
pub struct JwtAuthService<S> {
    inner: S,
    verifier: JwtVerifier,
    config: JwtLayerConfig,
    shutdown: CancellationToken,
}

impl<S> JwtAuthService<S> {
    /// Create a new JWT service
    pub fn new(
        inner: S,
        verifier: JwtVerifier,
        config: JwtLayerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner,
            verifier,
            config,
            shutdown,
        }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

/// Future type for [`JwtAuthService`] responses
pub type JwtAuthServiceFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// Token from `Bearer <token>` in header `name`, if present and non-empty.
pub fn bearer_token(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// JSON rejection for `err`: status 401 or 403, body `{"error": "<reason>"}`.
pub fn error_response<B>(err: &AuthError) -> Response<B>
where
    B: From<String>,
{
    let body = serde_json::json!({ "error": err.to_string() }).to_string();
    let mut response = Response::new(B::from(body));
    let status = err.status_code();
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if status == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    response
}

impl<S, B, ResBody> Service<Request<B>> for JwtAuthService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = JwtAuthServiceFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // Use the instance that was polled ready; leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if self.config.should_bypass(req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        let token = bearer_token(req.headers(), &self.config.auth_header);
        let verifier = self.verifier.clone();
        let cancel = self.shutdown.child_token();

        Box::pin(async move {
            let verified = match token {
                Some(token) => verifier.verify(&token, &cancel).await,
                None => Err(AuthError::MissingToken),
            };
            match verified {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    inner.call(req).await
                }
                Err(e) => {
                    debug!(path = %req.uri().path(), error = %e, "Rejecting request");
                    Ok(error_response(&e))
                }
            }
        })
    }
}
