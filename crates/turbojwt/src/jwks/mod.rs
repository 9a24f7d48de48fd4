//! JWKS (JSON Web Key Set) fetching and caching
//!
//! [`JwksCache`] owns the mapping from key id to RSA public key. The mapping
//! starts empty, is filled by the first successful [`JwksCache::fetch`] and is
//! replaced wholesale by every later successful fetch. A failed fetch leaves
//! the previous mapping untouched.
//!
//! Readers never wait on the network: the fetch decodes the new set without
//! any lock held and only takes the write lock to swap an `Arc`.
//!
//! The cache never refreshes on its own. Refresh-on-miss lives in the
//! verifier, which calls `fetch` at most once per token.

pub mod key;
pub mod source;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rsa::RsaPublicKey;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::FetchError;
use key::{JsonWebKeySet, decode_rsa_key};
use source::{HttpKeySetSource, HttpSourceConfig, KeySetSource};

/// Key id to verification key.
pub type KeySet = HashMap<String, Arc<RsaPublicKey>>;

/// Cache of the signer's published RSA keys.
///
/// # Example
///
/// ```rust,no_run
/// # use turbojwt::JwksCache;
/// # use tokio_util::sync::CancellationToken;
/// # tokio_test::block_on(async {
/// let cache = JwksCache::from_url("https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_pool")?;
/// let count = cache.fetch(&CancellationToken::new()).await?;
/// assert!(count > 0);
///
/// if let Some(key) = cache.lookup("key-id-123") {
///     // verify with key
/// #   let _ = key;
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
pub struct JwksCache {
    source: Arc<dyn KeySetSource>,
    keys: RwLock<Arc<KeySet>>,
}

impl JwksCache {
    /// Create an empty cache backed by `source`.
    pub fn new(source: impl KeySetSource + 'static) -> Self {
        Self::from_source(Arc::new(source))
    }

    /// Create an empty cache backed by a shared source.
    pub fn from_source(source: Arc<dyn KeySetSource>) -> Self {
        Self {
            source,
            keys: RwLock::new(Arc::new(KeySet::new())),
        }
    }

    /// Create an empty cache fetching `{base_url}/.well-known/jwks.json` over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidEndpoint`] if the URL is unusable.
    pub fn from_url(base_url: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self::new(HttpKeySetSource::new(base_url)?))
    }

    /// Create an empty cache with explicit HTTP settings.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidEndpoint`] if the URL is unusable.
    pub fn with_http(config: HttpSourceConfig) -> Result<Self, FetchError> {
        Ok(Self::new(HttpKeySetSource::with_config(config)?))
    }

    /// Retrieve the key set and replace the cached mapping.
    ///
    /// Non-RSA keys are dropped. RSA keys that fail to decode are logged and
    /// skipped. Returns the number of keys now cached.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Transport`] if the request fails
    /// - [`FetchError::Status`] if the status is not 200
    /// - [`FetchError::InvalidBody`] if the body is not a key set
    /// - [`FetchError::EmptyKeySet`] if no RSA key could be decoded
    /// - [`FetchError::Cancelled`] if `cancel` fires first
    ///
    /// On any error the previous mapping stays in place.
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<usize, FetchError> {
        let endpoint = self.source.endpoint();
        info!(jwks_url = %endpoint, "Fetching JWKS");

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(jwks_url = %endpoint, "JWKS fetch cancelled");
                return Err(FetchError::Cancelled);
            }
            response = self.source.get() => response?,
        };

        if response.status != 200 {
            error!(jwks_url = %endpoint, status = response.status, "JWKS endpoint returned error status");
            return Err(FetchError::Status(response.status));
        }

        let set: JsonWebKeySet = serde_json::from_slice(&response.body).map_err(|e| {
            error!(jwks_url = %endpoint, error = %e, "Failed to parse JWKS JSON");
            FetchError::InvalidBody(e.to_string())
        })?;

        let keys = decode_key_set(&set);
        if keys.is_empty() {
            error!(jwks_url = %endpoint, published = set.keys.len(), "JWKS contains no usable RSA key");
            return Err(FetchError::EmptyKeySet);
        }

        let key_count = keys.len();
        *self.keys.write() = Arc::new(keys);

        info!(jwks_url = %endpoint, key_count, "JWKS refreshed");
        Ok(key_count)
    }

    /// Key for `kid` in the current mapping. Never fetches.
    #[must_use]
    pub fn lookup(&self, kid: &str) -> Option<Arc<RsaPublicKey>> {
        self.keys.read().get(kid).cloned()
    }

    /// The current mapping. Later fetches do not affect the returned snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<KeySet> {
        Arc::clone(&*self.keys.read())
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// True until the first successful fetch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Cached key ids, sorted.
    #[must_use]
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.snapshot().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Where keys are fetched from.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.source.endpoint()
    }
}

impl fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwksCache")
            .field("source", &self.source)
            .field("key_count", &self.len())
            .finish()
    }
}

fn decode_key_set(set: &JsonWebKeySet) -> KeySet {
    let mut keys = KeySet::with_capacity(set.keys.len());
    for jwk in &set.keys {
        if !jwk.is_rsa() {
            debug!(kid = %jwk.kid, kty = %jwk.kty, "Ignoring non-RSA key");
            continue;
        }
        match decode_rsa_key(jwk) {
            Ok(key) => {
                keys.insert(jwk.kid.clone(), Arc::new(key));
            }
            Err(e) => {
                warn!(kid = %jwk.kid, error = %e, "Skipping undecodable JWK");
            }
        }
    }
    keys
}
