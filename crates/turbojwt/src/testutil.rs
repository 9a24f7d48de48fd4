//! Shared helpers for unit tests: one RSA key pair, JWK export and token signing.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::FetchError;
use crate::jwks::key::JsonWebKey;
use crate::jwks::source::{KeySetSource, SourceResponse};

/// 2048-bit signing key, generated once per test binary.
pub(crate) fn signing_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("failed to generate RSA key")
    })
}

/// A second, unrelated key for wrong-key tests.
pub(crate) fn other_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("failed to generate RSA key")
    })
}

pub(crate) fn public_key() -> RsaPublicKey {
    signing_key().to_public_key()
}

/// Export the public half of [`signing_key`] as an RSA JWK.
pub(crate) fn jwk(kid: &str) -> JsonWebKey {
    jwk_for(&public_key(), kid)
}

pub(crate) fn jwk_for(key: &RsaPublicKey, kid: &str) -> JsonWebKey {
    JsonWebKey {
        kid: kid.to_string(),
        kty: "RSA".to_string(),
        alg: "RS256".to_string(),
        n: URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
        e: URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
    }
}

/// Sign raw bytes with RS256.
pub(crate) fn sign(key: &RsaPrivateKey, input: &[u8]) -> Vec<u8> {
    let digest = Sha256::digest(input);
    key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .expect("failed to sign")
}

/// Build a compact token from header and claims JSON, signed with `key`.
pub(crate) fn encode_token(key: &RsaPrivateKey, header: &Value, claims: &Value) -> String {
    let header64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let claims64 = URL_SAFE_NO_PAD.encode(claims.to_string());
    let input = format!("{header64}.{claims64}");
    let signature = sign(key, input.as_bytes());
    format!("{input}.{}", URL_SAFE_NO_PAD.encode(signature))
}

/// RS256 token signed with [`signing_key`] under `kid`.
pub(crate) fn token(kid: &str, claims: &Value) -> String {
    let header = serde_json::json!({ "alg": "RS256", "typ": "JWT", "kid": kid });
    encode_token(signing_key(), &header, claims)
}

/// Serves a fixed key set and counts requests.
#[derive(Debug)]
pub(crate) struct StaticSource {
    body: String,
    calls: AtomicUsize,
}

impl StaticSource {
    /// Key set holding the public half of [`signing_key`] under each of `kids`.
    pub(crate) fn with_kids(kids: &[&str]) -> Self {
        let keys: Vec<JsonWebKey> = kids.iter().map(|kid| jwk(kid)).collect();
        Self {
            body: serde_json::json!({ "keys": keys }).to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetSource for StaticSource {
    async fn get(&self) -> Result<SourceResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SourceResponse::new(200, self.body.clone()))
    }

    fn endpoint(&self) -> &str {
        "static"
    }
}
