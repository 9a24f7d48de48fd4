//! RS256 (RSASSA-PKCS1-v1_5 with SHA-256) signature checks

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::SignatureError;

/// Verify `signature64` over `signing_input` with `key`.
///
/// `signing_input` must be the exact `header.claims` bytes of the token.
///
/// # Errors
///
/// [`SignatureError::Encoding`] if the signature is not unpadded base64url,
/// [`SignatureError::Mismatch`] if it does not verify.
pub fn verify_rs256(
    signing_input: &[u8],
    signature64: &str,
    key: &RsaPublicKey,
) -> Result<(), SignatureError> {
    let signature = URL_SAFE_NO_PAD
        .decode(signature64)
        .map_err(|_| SignatureError::Encoding)?;
    let digest = Sha256::digest(signing_input);

    key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
        .map_err(|_| SignatureError::Mismatch)
}
