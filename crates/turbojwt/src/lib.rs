//! # TurboJWT - JWKS Caching and RS256 Token Verification
//!
//! Verifies RS256-signed JSON Web Tokens against a signer's published key set
//! (AWS Cognito user pools and similar issuers) and checks the claims against
//! an issuer, token-use, client-id and role policy.
//!
//! ## Architecture
//!
//! - [`jwks`] - `JwksCache`: kid to RSA key mapping, atomic refresh from
//!   `{base}/.well-known/jwks.json`; JWK decoding and the key-set source trait
//! - [`jwt`] - compact token parsing and RS256 signature checks
//! - [`policy`] - `ClaimsPolicy` and `check_claims`
//! - [`verifier`] - `assert_jwt` and `JwtVerifier`: the full pipeline with
//!   one key-set refresh on an unknown kid
//! - [`config`] - `JwtAuthConfig`, loadable from `JWT_AUTH_*` variables
//! - [`tower`] - bearer-token middleware (feature `middleware`)
//! - [`error`] - per-stage errors and the caller-facing `AuthError`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use turbojwt::{ClaimsPolicy, JwksCache, JwtVerifier};
//!
//! # async fn run(token: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let pool = "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf";
//! let cache = Arc::new(JwksCache::from_url(pool)?);
//! let policy = ClaimsPolicy::access(pool)
//!     .client_id("3n4b5urk1ft4fl3mg5e62d9ado")
//!     .require_any(["admin", "owner"])
//!     .require_any(["billing"]);
//!
//! let verifier = JwtVerifier::new(cache, policy);
//! match verifier.verify(token, &CancellationToken::new()).await {
//!     Ok(claims) => println!("roles: {:?}", claims.roles),
//!     Err(e) if e.is_forbidden() => println!("403: {e}"),
//!     Err(e) => println!("401: {e}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `middleware` (default) - Tower layer for HTTP services

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod jwks;
pub mod jwt;
pub mod policy;
pub mod verifier;

#[cfg(feature = "middleware")]
#[cfg_attr(docsrs, doc(cfg(feature = "middleware")))]
pub mod tower;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{ConfigError, JwtAuthConfig};
pub use error::{
    AuthError, AuthResult, FetchError, FormatError, KeyDecodeError, Severity, SignatureError,
};
pub use jwks::JwksCache;
pub use jwks::key::{JsonWebKey, JsonWebKeySet, decode_rsa_key};
pub use jwks::source::{HttpKeySetSource, HttpSourceConfig, KeySetSource, SourceResponse};
pub use jwt::{
    ClaimsMap, TokenClaims, TokenHeader, TokenUse, decode_claims_map, decode_claims_unverified,
    verify_rs256,
};
pub use policy::{ClaimsPolicy, RoleParseError, RoleRequirement, check_claims};
pub use verifier::{JwtVerifier, assert_jwt};
