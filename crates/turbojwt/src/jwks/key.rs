//! JSON Web Key (RSA) to public key conversion

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::KeyDecodeError;

/// Key type accepted into the key set.
pub const KEY_TYPE_RSA: &str = "RSA";

/// A single entry of a published key set.
///
/// Only the members needed to build an RSA verification key are kept; anything
/// else the signer publishes (`use`, `x5c`, ...) is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key id referenced by token headers
    #[serde(default)]
    pub kid: String,
    /// Key type (`RSA`, `EC`, ...)
    #[serde(default)]
    pub kty: String,
    /// Intended algorithm
    #[serde(default)]
    pub alg: String,
    /// Modulus, unpadded base64url
    #[serde(default)]
    pub n: String,
    /// Public exponent, unpadded base64url
    #[serde(default)]
    pub e: String,
}

impl JsonWebKey {
    /// Whether this key should be decoded into the key set.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        self.kty == KEY_TYPE_RSA
    }
}

/// The `{"keys": [...]}` document served at the well-known endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Published keys
    pub keys: Vec<JsonWebKey>,
}

/// Convert an RSA JWK into a public key usable for signature checks.
///
/// # Errors
///
/// Returns [`KeyDecodeError`] if either member is not unpadded base64url, the
/// exponent exceeds `u32::MAX`, or the modulus/exponent pair is not a valid
/// RSA public key.
pub fn decode_rsa_key(jwk: &JsonWebKey) -> Result<RsaPublicKey, KeyDecodeError> {
    let n = URL_SAFE_NO_PAD
        .decode(&jwk.n)
        .map_err(|e| KeyDecodeError::ModulusEncoding(e.to_string()))?;
    let e = URL_SAFE_NO_PAD
        .decode(&jwk.e)
        .map_err(|e| KeyDecodeError::ExponentEncoding(e.to_string()))?;
    let exponent = decode_exponent(&e)?;

    RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from(exponent))
        .map_err(|e| KeyDecodeError::InvalidKey(e.to_string()))
}

/// Interpret big-endian exponent bytes as an unsigned 32-bit integer.
///
/// Three bytes (the usual `AQAB`) are widened with a leading zero byte, four
/// bytes are read directly, and any other length is treated as an
/// arbitrary-precision value that must still fit in 32 bits.
pub(crate) fn decode_exponent(bytes: &[u8]) -> Result<u32, KeyDecodeError> {
    match *bytes {
        [a, b, c] => Ok(u32::from_be_bytes([0, a, b, c])),
        [a, b, c, d] => Ok(u32::from_be_bytes([a, b, c, d])),
        _ => {
            let significant = bytes
                .iter()
                .position(|&b| b != 0)
                .map_or(&[][..], |start| &bytes[start..]);
            if significant.len() > 4 {
                return Err(KeyDecodeError::ExponentTooLarge);
            }
            Ok(significant
                .iter()
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
        }
    }
}
