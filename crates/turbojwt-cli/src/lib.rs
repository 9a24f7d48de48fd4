//! # TurboJWT CLI
//!
//! Command-line front end for [`turbojwt`]: inspect tokens, list a signer's
//! published keys and run the full verification pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Show header and claims (no verification)
//! turbojwt decode eyJhbGciOi...
//!
//! # List key ids published at <URL>/.well-known/jwks.json
//! turbojwt keys --jwks-url https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf
//!
//! # Verify an access token that must carry (admin or owner) and billing
//! echo "$TOKEN" | turbojwt verify - \
//!   --jwks-url https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbCdEf \
//!   --client-id 3n4b5urk1ft4fl3mg5e62d9ado \
//!   --require-any admin,owner --require-any billing
//! ```
//!
//! Exit status is 0 on success, 3 when a verified token lacks a required
//! role and 1 for every other failure.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

pub use cli::{Cli, Commands, SignerArgs, VerifyArgs};
pub use error::{CliError, CliResult};

/// Run the CLI application
///
/// # Errors
///
/// Returns the [`CliError`] of the failed command; see
/// [`CliError::exit_code`] for the process status.
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());
    execute(cli, shutdown_on_ctrl_c()).await
}

/// Run a parsed command, printing its result to stdout
///
/// # Errors
///
/// Returns the [`CliError`] of the failed command.
pub async fn execute(cli: Cli, cancel: CancellationToken) -> CliResult<()> {
    let value = match &cli.command {
        Commands::Decode { token } => commands::decode(&commands::read_token(token).await?)?,
        Commands::Keys { signer } => commands::keys(signer, &cancel).await?,
        Commands::Verify(args) => commands::verify(args, &cancel).await?,
    };
    output::display(cli.json, &value)
}

/// Log to stderr at `level`, unless `RUST_LOG` says otherwise.
fn init_tracing(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Token cancelled on the first Ctrl-C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });
    token
}
