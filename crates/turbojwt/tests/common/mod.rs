//! Common test utilities for integration tests
//!
//! Provides RSA signers that publish their keys through a wiremock JWKS
//! endpoint and mint RS256 tokens in the Cognito claim layout.

#![allow(dead_code)]

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const JWKS_PATH: &str = "/.well-known/jwks.json";
pub const CLIENT_ID: &str = "3n4b5urk1ft4fl3mg5e62d9ado";

/// Current UNIX timestamp in seconds
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs() as i64
}

/// An RSA key pair published under a key id
pub struct TestSigner {
    pub kid: String,
    pub key: RsaPrivateKey,
}

impl TestSigner {
    pub fn generate(kid: &str) -> Self {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
            .expect("failed to generate RSA key");
        Self {
            kid: kid.to_string(),
            key,
        }
    }

    /// Public half as a JWK
    pub fn jwk(&self) -> Value {
        json!({
            "kid": self.kid,
            "kty": "RSA",
            "alg": "RS256",
            "use": "sig",
            "n": URL_SAFE_NO_PAD.encode(self.key.n().to_bytes_be()),
            "e": URL_SAFE_NO_PAD.encode(self.key.e().to_bytes_be()),
        })
    }

    /// RS256 token with this signer's kid
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_header(
            &json!({ "alg": "RS256", "typ": "JWT", "kid": self.kid }),
            claims,
        )
    }

    pub fn sign_with_header(&self, header: &Value, claims: &Value) -> String {
        let input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        let digest = Sha256::digest(input.as_bytes());
        let signature = self
            .key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .expect("failed to sign");
        format!("{input}.{}", URL_SAFE_NO_PAD.encode(signature))
    }
}

/// Access-token claims for `issuer`, valid for `ttl` seconds from now
pub fn access_claims(issuer: &str, ttl: i64, groups: &[&str]) -> Value {
    json!({
        "sub": "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee",
        "iss": issuer,
        "token_use": "access",
        "client_id": CLIENT_ID,
        "scope": "openid",
        "exp": current_timestamp() + ttl,
        "iat": current_timestamp(),
        "cognito:groups": groups,
        "username": "alice",
    })
}

/// ID-token claims for `issuer`, valid for `ttl` seconds from now
pub fn id_claims(issuer: &str, ttl: i64) -> Value {
    json!({
        "sub": "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee",
        "iss": issuer,
        "token_use": "id",
        "aud": CLIENT_ID,
        "email": "alice@example.com",
        "exp": current_timestamp() + ttl,
    })
}

/// Mock signer publishing a JWKS
pub struct MockJwksServer {
    pub server: MockServer,
}

impl MockJwksServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL, also used as the token issuer
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Serve `signers` as the key set
    pub async fn publish(&self, signers: &[&TestSigner]) {
        let keys: Vec<Value> = signers.iter().map(|s| s.jwk()).collect();
        self.publish_json(json!({ "keys": keys })).await;
    }

    /// Serve `signers` for the next request only; later mounts answer afterwards
    pub async fn publish_once(&self, signers: &[&TestSigner]) {
        let keys: Vec<Value> = signers.iter().map(|s| s.jwk()).collect();
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Serve an arbitrary JSON body with status 200
    pub async fn publish_json(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer every JWKS request with `status`
    pub async fn fail_with(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Remove every mounted response
    pub async fn reset(&self) {
        self.server.reset().await;
    }

    /// Number of JWKS requests received so far
    pub async fn jwks_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }
}
