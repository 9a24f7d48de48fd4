//! JWKS fetching over HTTP
//!
//! Tests cover:
//! - status and body validation
//! - skipping unusable keys
//! - failed refreshes keeping the previous key set
//! - cancellation and request timeouts
//! - concurrent lookups while a refresh is in flight

mod common;

use common::{JWKS_PATH, MockJwksServer, TestSigner};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use turbojwt::{FetchError, HttpSourceConfig, JwksCache};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{method, path},
};

/// Test: keys are cached by kid and the count is reported
#[tokio::test]
async fn test_fetch_caches_rsa_keys() {
    let a = TestSigner::generate("a");
    let b = TestSigner::generate("b");
    let mock = MockJwksServer::start().await;
    mock.publish(&[&a, &b]).await;

    let cache = JwksCache::from_url(mock.uri()).unwrap();
    assert!(cache.is_empty());

    let count = cache.fetch(&CancellationToken::new()).await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.key_ids(), vec!["a", "b"]);
    assert!(cache.lookup("c").is_none());
}

/// Test: non-200 answers fail with the status code
#[tokio::test]
async fn test_non_200_status() {
    let mock = MockJwksServer::start().await;
    mock.fail_with(404).await;
    let cache = JwksCache::from_url(mock.uri()).unwrap();

    let err = cache.fetch(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err, FetchError::Status(404));
    assert_eq!(err.to_string(), "JWKS fetch: expected 200, got 404");
}

/// Test: bodies that are not a key set are rejected
#[tokio::test]
async fn test_invalid_body() {
    let mock = MockJwksServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock.server)
        .await;
    let cache = JwksCache::from_url(mock.uri()).unwrap();

    assert!(matches!(
        cache.fetch(&CancellationToken::new()).await,
        Err(FetchError::InvalidBody(_))
    ));
}

/// Test: a set with no usable RSA key is an error
#[tokio::test]
async fn test_empty_key_set() {
    let mock = MockJwksServer::start().await;
    mock.publish_json(json!({ "keys": [
        { "kid": "ec", "kty": "EC", "crv": "P-256", "x": "AA", "y": "AA" },
        { "kid": "broken", "kty": "RSA", "n": "@@", "e": "AQAB" },
    ]}))
    .await;
    let cache = JwksCache::from_url(mock.uri()).unwrap();

    let err = cache.fetch(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err, FetchError::EmptyKeySet);
    assert_eq!(err.to_string(), "JWKS fetch: empty key set");
}

/// Test: one bad key does not sink the rest of the set
#[tokio::test]
async fn test_bad_key_is_skipped() {
    let good = TestSigner::generate("good");
    let mut bad = good.jwk();
    bad["kid"] = json!("bad");
    bad["e"] = json!("AQAAAAAB"); // six significant bytes, exponent too large

    let mock = MockJwksServer::start().await;
    mock.publish_json(json!({ "keys": [bad, good.jwk()] })).await;
    let cache = JwksCache::from_url(mock.uri()).unwrap();

    assert_eq!(cache.fetch(&CancellationToken::new()).await.unwrap(), 1);
    assert!(cache.lookup("good").is_some());
    assert!(cache.lookup("bad").is_none());
}

/// Test: a failed refresh keeps serving the previous keys
#[tokio::test]
async fn test_failed_refresh_keeps_previous_keys() {
    let signer = TestSigner::generate("kid-1");
    let mock = MockJwksServer::start().await;
    mock.publish_once(&[&signer]).await;
    mock.fail_with(500).await;
    let cache = JwksCache::from_url(mock.uri()).unwrap();
    let cancel = CancellationToken::new();

    cache.fetch(&cancel).await.unwrap();
    assert_eq!(cache.fetch(&cancel).await, Err(FetchError::Status(500)));

    assert!(cache.lookup("kid-1").is_some());
    assert_eq!(mock.jwks_requests().await, 2);
}

/// Test: cancelling a slow fetch returns promptly and changes nothing
#[tokio::test]
async fn test_cancellation() {
    let signer = TestSigner::generate("kid-1");
    let mock = MockJwksServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "keys": [signer.jwk()] }))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock.server)
        .await;
    let cache = JwksCache::from_url(mock.uri()).unwrap();
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        })
    };

    let result = tokio::time::timeout(Duration::from_secs(5), cache.fetch(&cancel))
        .await
        .expect("fetch did not observe cancellation");
    canceller.await.unwrap();

    assert_eq!(result, Err(FetchError::Cancelled));
    assert!(cache.is_empty());
}

/// Test: the request timeout bounds a slow endpoint
#[tokio::test]
async fn test_request_timeout() {
    let mock = MockJwksServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&mock.server)
        .await;
    let cache = JwksCache::with_http(
        HttpSourceConfig::new(mock.uri()).timeout(Duration::from_millis(200)),
    )
    .unwrap();

    assert!(matches!(
        cache.fetch(&CancellationToken::new()).await,
        Err(FetchError::Transport(_))
    ));
}

/// Test: redirects are not followed
#[tokio::test]
async fn test_redirect_not_followed() {
    let mock = MockJwksServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://evil.example/jwks.json"),
        )
        .mount(&mock.server)
        .await;
    let cache = JwksCache::from_url(mock.uri()).unwrap();

    assert_eq!(
        cache.fetch(&CancellationToken::new()).await,
        Err(FetchError::Status(302))
    );
}

/// Test: readers keep working while refreshes replace the set
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_during_refresh() {
    let signer = TestSigner::generate("kid-1");
    let mock = MockJwksServer::start().await;
    mock.publish(&[&signer]).await;
    let cache = Arc::new(JwksCache::from_url(mock.uri()).unwrap());
    cache.fetch(&CancellationToken::new()).await.unwrap();

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for _ in 0..1000 {
                    assert!(cache.lookup("kid-1").is_some());
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    let refreshers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for _ in 0..5 {
                    cache.fetch(&CancellationToken::new()).await.unwrap();
                }
            })
        })
        .collect();

    for handle in readers.into_iter().chain(refreshers) {
        handle.await.unwrap();
    }
    assert_eq!(cache.len(), 1);
}
