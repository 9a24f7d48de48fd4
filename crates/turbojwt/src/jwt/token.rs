//! Compact JWT parsing
//!
//! Splits a token into its three segments and decodes header and claims
//! without touching the signature. Nothing here authorizes a token.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::FormatError;

/// The only accepted signature algorithm.
pub const ALG_RS256: &str = "RS256";

/// `token_use` of an access token.
pub const TOKEN_USE_ACCESS: &str = "access";

/// `token_use` of an ID token.
pub const TOKEN_USE_ID: &str = "id";

/// The three segments of a compact token, borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    /// Base64url header segment
    pub header: &'a str,
    /// Base64url claims segment
    pub claims: &'a str,
    /// Base64url signature segment
    pub signature: &'a str,
    signing_input: &'a str,
}

impl<'a> TokenParts<'a> {
    /// `header + "." + claims`, exactly as it appeared in the token.
    #[must_use]
    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }
}

/// Split a compact token into exactly three non-empty segments.
///
/// # Errors
///
/// Returns [`FormatError::Segments`] for any other shape.
pub fn split_token(token: &str) -> Result<TokenParts<'_>, FormatError> {
    let mut segments = token.split('.');
    let (Some(header), Some(claims), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(FormatError::Segments);
    };
    if header.is_empty() || claims.is_empty() || signature.is_empty() {
        return Err(FormatError::Segments);
    }

    Ok(TokenParts {
        header,
        claims,
        signature,
        signing_input: &token[..header.len() + 1 + claims.len()],
    })
}

/// JOSE header. Absent members decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signature algorithm
    #[serde(default, deserialize_with = "null_as_default")]
    pub alg: String,
    /// Token type
    #[serde(default, deserialize_with = "null_as_default")]
    pub typ: String,
    /// Signing key id
    #[serde(default, deserialize_with = "null_as_default")]
    pub kid: String,
}

impl TokenHeader {
    /// True when `alg` is RS256.
    #[must_use]
    pub fn is_rs256(&self) -> bool {
        self.alg == ALG_RS256
    }
}

/// Token-use specific claims, decided once when the claims are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenUse {
    /// `token_use = "access"`, identified by `client_id`.
    Access {
        /// OAuth client the token was issued to
        client_id: String,
    },
    /// `token_use = "id"`, identified by `aud`.
    Id {
        /// Audience (client id) of the ID token
        audience: String,
    },
    /// Any other discriminant, kept verbatim.
    Other(String),
}

impl TokenUse {
    /// Wire value of `token_use`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Access { .. } => TOKEN_USE_ACCESS,
            Self::Id { .. } => TOKEN_USE_ID,
            Self::Other(other) => other.as_str(),
        }
    }

    /// `client_id` for access tokens, `aud` for ID tokens.
    #[must_use]
    pub fn subject_id(&self) -> Option<&str> {
        match self {
            Self::Access { client_id } => Some(client_id.as_str()),
            Self::Id { audience } => Some(audience.as_str()),
            Self::Other(_) => None,
        }
    }
}

/// Claims consulted by the policy engine.
///
/// Serializes back to the flat wire shape it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawClaims", into = "RawClaims")]
pub struct TokenClaims {
    /// `iss`
    pub issuer: String,
    /// `token_use` plus its subject id
    pub token_use: TokenUse,
    /// `exp`, seconds since the Unix epoch
    pub expiry: i64,
    /// `cognito:groups`
    pub roles: Vec<String>,
    /// `email`, present on ID tokens
    pub email: Option<String>,
}

impl TokenClaims {
    /// `exp` as a timestamp, if representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expiry, 0)
    }
}

/// Flat superset of access and ID token claims, as found on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawClaims {
    #[serde(default, deserialize_with = "null_as_default")]
    iss: String,
    #[serde(default, deserialize_with = "null_as_default")]
    token_use: String,
    #[serde(default, deserialize_with = "null_as_default")]
    exp: i64,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    client_id: String,
    #[serde(
        rename = "cognito:groups",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    groups: Vec<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl From<RawClaims> for TokenClaims {
    fn from(raw: RawClaims) -> Self {
        let token_use = match raw.token_use.as_str() {
            TOKEN_USE_ACCESS => TokenUse::Access {
                client_id: raw.client_id,
            },
            TOKEN_USE_ID => TokenUse::Id { audience: raw.aud },
            _ => TokenUse::Other(raw.token_use),
        };
        Self {
            issuer: raw.iss,
            token_use,
            expiry: raw.exp,
            roles: raw.groups,
            email: raw.email,
        }
    }
}

impl From<TokenClaims> for RawClaims {
    fn from(claims: TokenClaims) -> Self {
        let mut raw = Self {
            iss: claims.issuer,
            token_use: claims.token_use.as_str().to_string(),
            exp: claims.expiry,
            groups: claims.roles,
            email: claims.email,
            ..Self::default()
        };
        match claims.token_use {
            TokenUse::Access { client_id } => raw.client_id = client_id,
            TokenUse::Id { audience } => raw.aud = audience,
            TokenUse::Other(_) => {}
        }
        raw
    }
}

/// Decode the header segment.
///
/// # Errors
///
/// [`FormatError::HeaderEncoding`] or [`FormatError::HeaderJson`].
pub fn decode_header(header64: &str) -> Result<TokenHeader, FormatError> {
    decode_segment(header64, FormatError::HeaderEncoding, FormatError::HeaderJson)
}

/// Decode the claims segment into the typed view.
///
/// # Errors
///
/// [`FormatError::ClaimsEncoding`] or [`FormatError::ClaimsJson`].
pub fn decode_claims(claims64: &str) -> Result<TokenClaims, FormatError> {
    decode_segment(claims64, FormatError::ClaimsEncoding, FormatError::ClaimsJson)
}

fn decode_segment<T: DeserializeOwned>(
    segment: &str,
    encoding: FormatError,
    json: FormatError,
) -> Result<T, FormatError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|_| encoding)?;
    // Must be a JSON object; derived structs also accept arrays
    let object: Map<String, Value> = serde_json::from_slice(&bytes).map_err(|_| json)?;
    serde_json::from_value(Value::Object(object)).map_err(|_| json)
}

/// Open view of the claims of an unverified token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimsMap {
    /// Every claim, in token order
    pub claims: Map<String, Value>,
    /// Numeric `exp` as a timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ClaimsMap {
    /// Look up a claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}

/// Decode the claims of `token` as an open map, without verifying anything.
///
/// Only for display and debugging.
///
/// # Errors
///
/// Returns [`FormatError`] if the token is not three segments or the claims
/// segment is not a base64url JSON object.
pub fn decode_claims_map(token: &str) -> Result<ClaimsMap, FormatError> {
    let parts = split_token(token)?;
    let claims: Map<String, Value> = decode_segment(
        parts.claims,
        FormatError::ClaimsEncoding,
        FormatError::ClaimsJson,
    )?;
    let expires_at = claims
        .get("exp")
        .and_then(Value::as_f64)
        .and_then(|exp| DateTime::from_timestamp(exp as i64, 0));

    Ok(ClaimsMap { claims, expires_at })
}

/// Decode the typed claims of `token`, without verifying anything.
///
/// Only for display and debugging.
///
/// # Errors
///
/// Returns [`FormatError`] if the token is not three segments or the claims
/// segment does not decode.
pub fn decode_claims_unverified(token: &str) -> Result<TokenClaims, FormatError> {
    decode_claims(split_token(token)?.claims)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
