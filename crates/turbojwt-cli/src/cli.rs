//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use tracing::Level;
use turbojwt::{JwtAuthConfig, RoleRequirement};

use crate::error::{CliError, CliResult};

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "turbojwt",
    version,
    about = "Decode JWTs, inspect JWKS endpoints and verify RS256 tokens",
    long_about = "TurboJWT inspects and verifies RS256 JSON Web Tokens issued by \
                  a JWKS-publishing signer such as an AWS Cognito user pool.\n\n\
                  Tokens can be passed as an argument or read from stdin with '-'.\n\
                  'decode' never verifies anything; use 'verify' before trusting claims."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (-v, -vv, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print compact single-line JSON
    #[arg(long, global = true)]
    pub json: bool,
}

impl Cli {
    /// Log level for the verbosity count
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the header and claims of a token without verifying it
    Decode {
        /// Token, or '-' to read it from stdin
        token: String,
    },

    /// Fetch the key set once and list its key ids
    Keys {
        #[command(flatten)]
        signer: SignerArgs,
    },

    /// Verify a token and print its claims
    Verify(VerifyArgs),
}

/// Where the signer publishes its keys
#[derive(Args, Debug, Clone)]
pub struct SignerArgs {
    /// Signer base URL; keys are read from <URL>/.well-known/jwks.json
    #[arg(long, env = "JWT_AUTH_JWKS_URL")]
    pub jwks_url: String,

    /// Key-set request timeout in seconds
    #[arg(long, env = "JWT_AUTH_HTTP_TIMEOUT_SECS", default_value_t = 5)]
    pub timeout: u64,

    /// Open a fresh connection for every key-set request
    #[arg(long)]
    pub no_keep_alive: bool,
}

/// Token and policy for `verify`
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Token, or '-' to read it from stdin
    pub token: String,

    #[command(flatten)]
    pub signer: SignerArgs,

    /// Expected issuer (defaults to the JWKS URL)
    #[arg(long, env = "JWT_AUTH_ISSUER")]
    pub issuer: Option<String>,

    /// Expected token use
    #[arg(long, env = "JWT_AUTH_TOKEN_USE", default_value = "access")]
    pub token_use: String,

    /// Accepted client id (repeatable or comma-separated)
    #[arg(
        long = "client-id",
        env = "JWT_AUTH_CLIENT_IDS",
        value_delimiter = ',',
        required = true
    )]
    pub client_ids: Vec<String>,

    /// Require at least one of these comma-separated roles (repeatable; all groups must match)
    #[arg(long = "require-any", value_name = "ROLES")]
    pub require_any: Vec<String>,

    /// Role groups in 'a,b;c' form, combined with --require-any
    #[arg(long, env = "JWT_AUTH_REQUIRED_ROLES", value_name = "GROUPS")]
    pub roles: Option<String>,
}

impl VerifyArgs {
    /// Role requirement from `--roles` followed by each `--require-any`
    ///
    /// # Errors
    ///
    /// [`CliError::InvalidArguments`] if a role group names no role.
    pub fn role_requirement(&self) -> CliResult<RoleRequirement> {
        let base = self
            .roles
            .as_deref()
            .unwrap_or_default()
            .parse::<RoleRequirement>()
            .map_err(|e| CliError::InvalidArguments(format!("--roles: {e}")))?;

        self.require_any.iter().try_fold(base, |requirement, group| {
            let roles: Vec<&str> = group
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .collect();
            if roles.is_empty() {
                return Err(CliError::InvalidArguments(format!(
                    "--require-any {group:?} names no role"
                )));
            }
            Ok(requirement.any_of(roles))
        })
    }

    /// Verifier configuration described by the arguments
    ///
    /// # Errors
    ///
    /// See [`VerifyArgs::role_requirement`].
    pub fn to_config(&self) -> CliResult<JwtAuthConfig> {
        let issuer = self
            .issuer
            .clone()
            .unwrap_or_else(|| self.signer.jwks_url.clone());
        Ok(JwtAuthConfig {
            token_use: self.token_use.clone(),
            client_ids: self.client_ids.clone(),
            required_roles: self.role_requirement()?,
            http_timeout_secs: self.signer.timeout,
            keep_alive: !self.signer.no_keep_alive,
            ..JwtAuthConfig::new(self.signer.jwks_url.clone(), issuer)
        })
    }
}
