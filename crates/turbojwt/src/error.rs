//! Error types for key decoding, key-set fetching, token parsing and verification
//!
//! Each pipeline stage has its own error enum so callers that use a single
//! stage (for example the read-only decode helpers) get a precise type.
//! [`AuthError`] is what the verification entry points return: every variant
//! is a distinct kind, and [`AuthError::severity`] collapses them to the two
//! externally visible classes, unauthorized and forbidden.

use std::fmt;

use thiserror::Error;

/// A specialized `Result` type for verification.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Failure converting a JSON Web Key into an RSA public key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyDecodeError {
    /// The `n` member is not unpadded base64url.
    #[error("invalid JWK modulus encoding: {0}")]
    ModulusEncoding(String),

    /// The `e` member is not unpadded base64url.
    #[error("invalid JWK exponent encoding: {0}")]
    ExponentEncoding(String),

    /// The exponent does not fit in an unsigned 32-bit integer.
    #[error("JWK exponent too large")]
    ExponentTooLarge,

    /// The modulus/exponent pair was rejected by the RSA implementation.
    #[error("invalid RSA public key: {0}")]
    InvalidKey(String),
}

/// Failure refreshing the key set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchError {
    /// The HTTP request could not be performed.
    #[error("JWKS fetch: {0}")]
    Transport(String),

    /// The endpoint answered with something other than 200.
    #[error("JWKS fetch: expected 200, got {0}")]
    Status(u16),

    /// The response body is not a JSON key set.
    #[error("JWKS fetch: invalid key set: {0}")]
    InvalidBody(String),

    /// No usable RSA key survived decoding.
    #[error("JWKS fetch: empty key set")]
    EmptyKeySet,

    /// The caller cancelled the fetch before it completed.
    #[error("JWKS fetch: cancelled")]
    Cancelled,

    /// The key-set endpoint is not acceptable (bad URL, plain HTTP to a remote host).
    #[error("JWKS endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Structural failure while parsing a compact JWT.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormatError {
    /// Not exactly three non-empty dot-separated segments.
    #[error("invalid JWT format")]
    Segments,

    /// Header segment is not unpadded base64url.
    #[error("invalid JWT header encoding")]
    HeaderEncoding,

    /// Header segment is not the expected JSON object.
    #[error("invalid JWT header format")]
    HeaderJson,

    /// Claims segment is not unpadded base64url.
    #[error("invalid JWT claims encoding")]
    ClaimsEncoding,

    /// Claims segment is not the expected JSON object.
    #[error("invalid JWT claims format")]
    ClaimsJson,
}

/// Failure checking an RS256 signature.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SignatureError {
    /// Signature segment is not unpadded base64url.
    #[error("invalid JWT signature format")]
    Encoding,

    /// The signature does not match the signing input under the key.
    #[error("invalid JWT signature")]
    Mismatch,
}

/// Externally observable failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The caller could not be authenticated (401).
    Unauthorized,
    /// The caller is authenticated but lacks a required role (403).
    Forbidden,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::Forbidden => f.write_str("forbidden"),
        }
    }
}

/// Verification failure returned by [`crate::assert_jwt`] and [`crate::JwtVerifier`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    /// Token structure or encoding is malformed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Header `alg` is not RS256.
    #[error("unsupported JWT signature algorithm")]
    UnsupportedAlgorithm(String),

    /// The header `kid` is unknown even after refreshing the key set.
    #[error("JWKS kid is not found")]
    KeyNotFound(String),

    /// The key set could not be refreshed.
    ///
    /// Reported as unauthorized: the verifier cannot vouch for the token.
    #[error(transparent)]
    KeySetUnavailable(#[from] FetchError),

    /// Signature segment undecodable or not matching.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// `iss` does not match the expected issuer.
    #[error("invalid JWT issuer")]
    InvalidIssuer,

    /// `token_use` does not match the expected token use.
    #[error("invalid JWT use")]
    InvalidTokenUse,

    /// `exp` is in the past.
    #[error("expired JWT")]
    Expired,

    /// The policy asks for a token use that has no subject-id rule.
    #[error("invalid token use")]
    UnknownTokenUse(String),

    /// `client_id` (access) or `aud` (id) is not an accepted client.
    #[error("invalid client ID")]
    InvalidClientId,

    /// No role from this group is present in the token.
    #[error("missing role: {}", describe_role_group(.group))]
    MissingRole {
        /// Members of the first unsatisfied OR-group, in policy order.
        group: Vec<String>,
    },

    /// The request carried no usable bearer token.
    #[error("missing bearer token")]
    MissingToken,
}

fn describe_role_group(group: &[String]) -> String {
    if group.is_empty() {
        "an empty role group cannot be satisfied".to_string()
    } else {
        format!("at least one of {} is required", group.join(", "))
    }
}

impl AuthError {
    /// Collapse this error to its externally visible class.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingRole { .. } => Severity::Forbidden,
            _ => Severity::Unauthorized,
        }
    }

    /// HTTP status for this error: 401 for unauthorized, 403 for forbidden.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self.severity() {
            Severity::Unauthorized => http::StatusCode::UNAUTHORIZED,
            Severity::Forbidden => http::StatusCode::FORBIDDEN,
        }
    }

    /// True for the 401 class.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.severity() == Severity::Unauthorized
    }

    /// True for the 403 class.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.severity() == Severity::Forbidden
    }
}
