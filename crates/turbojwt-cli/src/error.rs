//! Error types for CLI operations

use thiserror::Error;
use turbojwt::{AuthError, ConfigError, FetchError, FormatError};

/// Exit code for bad input, failed fetches and 401-class rejections.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for a valid token that lacks a required role.
pub const EXIT_FORBIDDEN: i32 = 3;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Token rejected by the verifier
    #[error("{} ({}): {}", .0.status_code().as_u16(), .0.severity(), .0)]
    Auth(#[from] AuthError),

    /// Key set could not be fetched
    #[error("JWKS fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Token could not be decoded
    #[error("{0}")]
    Format(#[from] FormatError),

    /// Invalid verifier configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Generic error with context
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit code: 3 when the caller lacks a role, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Auth(e) if e.is_forbidden() => EXIT_FORBIDDEN,
            _ => EXIT_FAILURE,
        }
    }

    /// Hints for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Auth(AuthError::KeyNotFound(_)) => vec![
                "Check that --jwks-url points at the signer that issued the token",
                "Run 'turbojwt keys' to list the published key ids",
            ],
            Self::Auth(AuthError::InvalidIssuer) => vec![
                "Pass the token's 'iss' value with --issuer",
                "Run 'turbojwt decode' to inspect the claims",
            ],
            Self::Auth(AuthError::InvalidClientId) => {
                vec!["Add the token's client id with --client-id"]
            }
            Self::Auth(AuthError::KeySetUnavailable(_)) | Self::Fetch(_) => vec![
                "Verify the signer URL and network connectivity",
                "Increase the request timeout with --timeout",
            ],
            Self::Config(ConfigError::Endpoint(_)) => {
                vec!["Key sets are only fetched over HTTPS (or HTTP to localhost)"]
            }
            Self::InvalidArguments(_) => vec!["Use --help to see expected arguments"],
            _ => vec![],
        }
    }
}
