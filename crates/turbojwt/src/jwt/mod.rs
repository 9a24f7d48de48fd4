//! JWT parsing and RS256 signature verification
//!
//! - [`token`] splits compact tokens and decodes header and claims
//! - [`signature`] checks RSASSA-PKCS1-v1_5 / SHA-256 signatures
//!
//! Neither module makes an authorization decision; see [`crate::verifier`].

pub mod signature;
pub mod token;

pub use signature::verify_rs256;
pub use token::{
    ALG_RS256, ClaimsMap, TOKEN_USE_ACCESS, TOKEN_USE_ID, TokenClaims, TokenHeader, TokenParts,
    TokenUse, decode_claims, decode_claims_map, decode_claims_unverified, decode_header,
    split_token,
};
