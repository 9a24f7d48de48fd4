//! Command implementations

use std::time::Duration;

use anyhow::Context;
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use turbojwt::jwt::{decode_claims_map, decode_header, split_token};
use turbojwt::{HttpSourceConfig, JwksCache};

use crate::cli::{SignerArgs, VerifyArgs};
use crate::error::{CliError, CliResult};

/// Resolve a token argument; `-` reads the token from stdin.
pub async fn read_token(arg: &str) -> CliResult<String> {
    let raw = if arg == "-" {
        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context("failed to read token from stdin")?;
        input
    } else {
        arg.to_string()
    };

    let token = raw.trim();
    let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
    if token.is_empty() {
        return Err(CliError::InvalidArguments("empty token".into()));
    }
    Ok(token.to_string())
}

/// Header and claims of `token`, without any verification.
pub fn decode(token: &str) -> CliResult<Value> {
    let parts = split_token(token)?;
    let header = decode_header(parts.header)?;
    let claims = decode_claims_map(token)?;
    Ok(json!({
        "header": header,
        "claims": claims.claims,
        "expires_at": claims.expires_at,
        "verified": false,
    }))
}

/// Fetch the key set once and list the usable key ids.
pub async fn keys(signer: &SignerArgs, cancel: &CancellationToken) -> CliResult<Value> {
    let config = HttpSourceConfig::new(signer.jwks_url.clone())
        .timeout(Duration::from_secs(signer.timeout))
        .keep_alive(!signer.no_keep_alive);
    let cache = JwksCache::with_http(config)?;

    let count = cache.fetch(cancel).await?;
    info!(endpoint = %cache.endpoint(), keys = count, "Key set fetched");

    Ok(json!({
        "endpoint": cache.endpoint(),
        "keys": cache.key_ids(),
    }))
}

/// Verify `args.token` against the signer and policy; returns the verified claims.
pub async fn verify(args: &VerifyArgs, cancel: &CancellationToken) -> CliResult<Value> {
    let token = read_token(&args.token).await?;
    let config = args.to_config()?;
    debug!(
        issuer = %config.issuer,
        token_use = %config.token_use,
        roles = %config.required_roles,
        "Verifying token"
    );

    let verifier = config.build_verifier()?;
    let claims = verifier.verify(&token, cancel).await?;

    Ok(json!({
        "verified": true,
        "claims": claims,
        "expires_at": claims.expires_at(),
    }))
}
