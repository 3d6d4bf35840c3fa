//! Command-line and environment configuration.
//!
//! Process settings come from command-line arguments with `SURVEY_`-prefixed
//! environment fallbacks. The survey document itself is read from `CONFIG`
//! (see [`crate::app_config`]).
//!
//! # Commands
//!
//! - `serve` (default): run the HTTP server
//! - `sign`: issue a signed identity token for `--auth-mode token`
//! - `check`: validate the `CONFIG` document without starting the server
//!
//! # Environment Variables
//!
//! - `CONFIG` - YAML survey document (required)
//! - `SURVEY_HOST` - Server bind address (default: 0.0.0.0)
//! - `SURVEY_PORT` - Server port (default: 5000)
//! - `SURVEY_STATIC_DIR` - Directory with the single-page app (default: static)
//! - `SURVEY_AUTH_MODE` - `proxy` or `token` (default: proxy)
//! - `SURVEY_AUTH_SECRET` - HMAC secret for signed tokens
//! - `SURVEY_USER_HEADER` - Proxy header with the user name (default: x-forwarded-user)
//! - `SURVEY_GROUPS_HEADER` - Proxy header with the groups (default: x-forwarded-groups)
//! - `SURVEY_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::app_config::AppConfig;
use crate::error::AppConfigError;
use crate::server::auth::{
    ProxyHeaderAuth, SharedAuthenticator, SignedTokenAuth, DEFAULT_GROUPS_HEADER,
    DEFAULT_USER_HEADER,
};
use crate::server::routes::{RouterConfig, DEFAULT_STATIC_DIR};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default token lifetime for `sign` (1 hour).
pub const DEFAULT_TOKEN_TTL: u64 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Survey Front - serves a survey single-page app and its JSON API.
#[derive(Parser, Debug, Clone)]
#[command(name = "survey-front")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server options, used when no subcommand is given
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeConfig),

    /// Print a signed identity token
    Sign(SignConfig),

    /// Validate the CONFIG document
    Check(CheckConfig),
}

/// How protected routes authenticate callers.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Trust identity headers set by an authenticating reverse proxy
    Proxy,

    /// Require `Authorization: Bearer` tokens signed with the auth secret
    Token,
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "SURVEY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SURVEY_PORT")]
    pub port: u16,

    /// Directory holding the single-page app (must contain index.html).
    #[arg(long, default_value = DEFAULT_STATIC_DIR, env = "SURVEY_STATIC_DIR")]
    pub static_dir: PathBuf,

    /// YAML survey document.
    #[arg(long = "config", env = "CONFIG", hide_env_values = true)]
    pub config: Option<String>,

    /// Authentication mode for protected routes.
    #[arg(long, value_enum, default_value_t = AuthMode::Proxy, env = "SURVEY_AUTH_MODE")]
    pub auth_mode: AuthMode,

    /// Secret key for HMAC-SHA256 signed tokens (required in token mode).
    #[arg(long, env = "SURVEY_AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: Option<String>,

    /// Header carrying the user name in proxy mode.
    #[arg(long, default_value = DEFAULT_USER_HEADER, env = "SURVEY_USER_HEADER")]
    pub user_header: String,

    /// Header carrying the comma-separated groups in proxy mode.
    #[arg(long, default_value = DEFAULT_GROUPS_HEADER, env = "SURVEY_GROUPS_HEADER")]
    pub groups_header: String,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "SURVEY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_mode == AuthMode::Token
            && self.auth_secret.as_deref().map_or(true, str::is_empty)
        {
            return Err(
                "Token authentication is enabled but no secret provided. \
                 Set --auth-secret or SURVEY_AUTH_SECRET, or use --auth-mode=proxy"
                    .to_string(),
            );
        }

        if self.auth_mode == AuthMode::Proxy {
            http::HeaderName::from_bytes(self.user_header.as_bytes())
                .map_err(|_| format!("Invalid user header name: '{}'", self.user_header))?;
            http::HeaderName::from_bytes(self.groups_header.as_bytes())
                .map_err(|_| format!("Invalid groups header name: '{}'", self.groups_header))?;
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse the survey document.
    pub fn load_app_config(&self) -> Result<AppConfig, AppConfigError> {
        load_document(self.config.as_deref())
    }

    /// Build the authenticator selected by `auth_mode` (call validate() first).
    pub fn build_authenticator(&self) -> Result<SharedAuthenticator, String> {
        match self.auth_mode {
            AuthMode::Proxy => {
                let auth = ProxyHeaderAuth::with_header_names(&self.user_header, &self.groups_header)
                    .map_err(|e| format!("Invalid header name: {}", e))?;
                Ok(Arc::new(auth))
            }
            AuthMode::Token => {
                let secret = self
                    .auth_secret
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| "Missing auth secret".to_string())?;
                Ok(Arc::new(SignedTokenAuth::new(secret)))
            }
        }
    }

    /// Build the router configuration.
    pub fn router_config(&self) -> Result<RouterConfig, String> {
        let mut router_config = RouterConfig::new(self.build_authenticator()?)
            .with_static_dir(self.static_dir.clone())
            .with_tracing(!self.no_tracing);

        if let Some(ref origins) = self.cors_origins {
            router_config = router_config.with_cors_origins(origins.clone());
        }

        Ok(router_config)
    }
}

// =============================================================================
// Sign
// =============================================================================

/// Output format for the `sign` command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutputFormat {
    /// The bare token
    Token,

    /// A complete `Authorization` header line
    Header,

    /// JSON with the token and its claims
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct SignConfig {
    /// Secret key shared with the server.
    #[arg(long, env = "SURVEY_AUTH_SECRET", hide_env_values = true)]
    pub secret: String,

    /// User name to put in the token.
    #[arg(long)]
    pub user: String,

    /// Group membership (repeatable or comma-separated).
    #[arg(long = "group", value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL)]
    pub ttl: u64,

    /// Output format.
    #[arg(long, value_enum, default_value_t = SignOutputFormat::Token)]
    pub format: SignOutputFormat,
}

impl SignConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("Secret must not be empty".to_string());
        }
        if self.user.trim().is_empty() {
            return Err("User must not be empty".to_string());
        }
        if self.groups.iter().any(|g| g.trim().is_empty()) {
            return Err("Group names must not be empty".to_string());
        }
        if self.ttl == 0 {
            return Err("TTL must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Group names with surrounding whitespace removed.
    pub fn trimmed_groups(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.trim().to_string()).collect()
    }
}

// =============================================================================
// Check
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// YAML survey document.
    #[arg(long = "config", env = "CONFIG", hide_env_values = true)]
    pub config: Option<String>,

    /// Print the parsed questions.
    #[arg(long, default_value_t = false)]
    pub show_questions: bool,
}

impl CheckConfig {
    pub fn load_app_config(&self) -> Result<AppConfig, AppConfigError> {
        load_document(self.config.as_deref())
    }
}

fn load_document(document: Option<&str>) -> Result<AppConfig, AppConfigError> {
    match document {
        Some(document) => AppConfig::from_yaml(document),
        None => Err(AppConfigError::Missing),
    }
}

// =============================================================================
// Tests
// =============================================================================
