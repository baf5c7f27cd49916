//! Command-line interface definition for grantflow
//!
//! This module defines the CLI structure using clap's derive API,
//! providing one command per grant-flow step.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// grantflow - OAuth2 client for device, PKCE, web and JWT bearer grants
///
/// Loads a credential file, runs one step of the matching grant flow, and
/// prints the result as JSON on stdout. Logs go to stderr.
#[derive(Parser, Debug, Clone)]
#[command(name = "grantflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the credential file (JSON, or YAML with .yaml/.yml)
    #[arg(
        short,
        long,
        env = "GRANTFLOW_CONFIG",
        default_value = "coze_oauth_config.json"
    )]
    pub config: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for grantflow
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the device flow: show the user code, then poll until authorized
    Device,

    /// Obtain a service token with a signed JWT assertion
    Jwt {
        /// Requested token lifetime in seconds
        #[arg(long, default_value_t = 900)]
        duration: u32,

        /// Session name to isolate tokens per end user
        #[arg(long)]
        session_name: Option<String>,

        /// Scope object as JSON
        #[arg(long)]
        scope: Option<String>,
    },

    /// Print the consent page URL (PKCE or web clients)
    AuthorizeUrl {
        /// Redirect URI registered for the client
        #[arg(long)]
        redirect_uri: String,

        /// State value; a random one is generated when omitted
        #[arg(long)]
        state: Option<String>,
    },

    /// Exchange an authorization code for tokens (PKCE or web clients)
    Exchange {
        /// Authorization code from the callback
        #[arg(long)]
        code: String,

        /// Redirect URI used in the authorization request
        #[arg(long)]
        redirect_uri: String,

        /// PKCE code verifier printed by `authorize-url`
        #[arg(long)]
        code_verifier: Option<String>,
    },

    /// Exchange a refresh token for new tokens
    Refresh {
        /// Refresh token to redeem
        #[arg(long, env = "GRANTFLOW_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
    },
}

impl Cli {
    /// Parse CLI arguments from the environment
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
