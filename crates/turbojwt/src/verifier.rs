//! Token verification pipeline
//!
//! [`assert_jwt`] runs the full check on one token:
//!
//! 1. split into three segments and decode the header
//! 2. require `alg = RS256`
//! 3. look up `kid`; on a miss refresh the key set once and look up again
//! 4. decode the claims
//! 5. verify the signature over `header.claims`
//! 6. check the claims against the policy
//!
//! Key rotation is handled by step 3: an unknown `kid` triggers exactly one
//! fetch. Callers that want to bound how often that happens should wrap the
//! cache themselves.

use std::sync::Arc;

use chrono::Utc;
use rsa::RsaPublicKey;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::jwks::JwksCache;
use crate::jwt::{TokenClaims, decode_claims, decode_header, split_token, verify_rs256};
use crate::policy::{ClaimsPolicy, RoleRequirement};

/// Verify `token` against `cache` and `policy`.
///
/// Returns the verified claims.
///
/// # Errors
///
/// Every failure is an [`AuthError`]; see [`AuthError::severity`] for how it
/// maps to unauthorized or forbidden.
pub async fn assert_jwt(
    cancel: &CancellationToken,
    token: &str,
    cache: &JwksCache,
    policy: &ClaimsPolicy,
) -> AuthResult<TokenClaims> {
    let result = verify_token(cancel, token, cache, policy).await;
    match &result {
        Ok(claims) => debug!(
            issuer = %claims.issuer,
            token_use = claims.token_use.as_str(),
            "JWT verified"
        ),
        Err(e) => warn!(error = %e, severity = %e.severity(), "JWT rejected"),
    }
    result
}

async fn verify_token(
    cancel: &CancellationToken,
    token: &str,
    cache: &JwksCache,
    policy: &ClaimsPolicy,
) -> AuthResult<TokenClaims> {
    let parts = split_token(token)?;
    let header = decode_header(parts.header)?;
    if !header.is_rs256() {
        return Err(AuthError::UnsupportedAlgorithm(header.alg));
    }

    let key = resolve_key(cancel, &header.kid, cache).await?;
    let claims = decode_claims(parts.claims)?;
    verify_rs256(parts.signing_input().as_bytes(), parts.signature, &key)?;
    policy.check(&claims, Utc::now())?;

    Ok(claims)
}

async fn resolve_key(
    cancel: &CancellationToken,
    kid: &str,
    cache: &JwksCache,
) -> AuthResult<Arc<RsaPublicKey>> {
    if let Some(key) = cache.lookup(kid) {
        return Ok(key);
    }

    info!(kid = %kid, "Unknown JWT kid, refreshing JWKS");
    cache.fetch(cancel).await?;

    cache
        .lookup(kid)
        .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
}

/// A key cache and a policy bundled for repeated verification.
///
/// Cloning is cheap; clones share the cache.
#[derive(Debug, Clone)]
pub struct JwtVerifier {
    cache: Arc<JwksCache>,
    policy: Arc<ClaimsPolicy>,
}

impl JwtVerifier {
    /// Create a verifier.
    pub fn new(cache: Arc<JwksCache>, policy: ClaimsPolicy) -> Self {
        Self {
            cache,
            policy: Arc::new(policy),
        }
    }

    /// Verify `token`.
    ///
    /// # Errors
    ///
    /// See [`assert_jwt`].
    pub async fn verify(&self, token: &str, cancel: &CancellationToken) -> AuthResult<TokenClaims> {
        assert_jwt(cancel, token, &self.cache, &self.policy).await
    }

    /// A verifier sharing this cache with `roles` replacing the role requirement.
    #[must_use]
    pub fn with_roles(&self, roles: RoleRequirement) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            policy: Arc::new(self.policy.as_ref().clone().with_roles(roles)),
        }
    }

    /// The shared key cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<JwksCache> {
        &self.cache
    }

    /// The policy tokens are checked against.
    #[must_use]
    pub fn policy(&self) -> &ClaimsPolicy {
        &self.policy
    }
}
