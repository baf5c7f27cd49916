//! grantflow - OAuth2 client engine
//!
//! This library implements the client side of four OAuth2 grant types
//! against a single authorization-server family: the device authorization
//! grant, the authorization code grant with PKCE, the authorization code
//! grant for confidential web clients, and the JWT bearer grant.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `credential`: Validated credential model and grant type
//! - `config`: Credential file loading and client options
//! - `pkce`: PKCE S256 verifier and challenge generation
//! - `jwt`: RS256 bearer assertion signing
//! - `token`: Normalized token response with absolute expiry
//! - `grant`: Grant engines, the shared refresh operation, and `OAuthClient`
//! - `transport`: The `HttpTransport` network boundary and its reqwest backend
//! - `clock`: Injectable wall clock
//! - `types`: Redacted, zeroizing secret newtypes
//! - `error`: Error types and result aliases
//! - `cli` and `commands`: Command-line front-end
//!
//! # Example
//!
//! ```no_run
//! use grantflow::config::{ClientOptions, CredentialConfig};
//! use grantflow::grant::OAuthClient;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credential = CredentialConfig::load("coze_oauth_config.json")?.into_credential()?;
//!     let client = OAuthClient::from_credential(credential, ClientOptions::default())?;
//!
//!     if let Some(device) = client.as_device() {
//!         let session = device.request_device_code().await?;
//!         println!("Visit {}", session.verification_url);
//!         let token = device.poll_for_token(session, &CancellationToken::new()).await?;
//!         println!("Token expires at {}", token.expires_at);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod credential;
pub mod error;
pub mod grant;
pub mod jwt;
pub mod pkce;
pub mod token;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BodyEncoding, ClientOptions, CredentialConfig};
pub use credential::{Credential, GrantType};
pub use error::{OAuthError, Result};
pub use grant::{
    generate_state, DeviceCodeSession, DeviceGrantEngine, GrantEngine, JwtGrantEngine,
    JwtGrantOptions, OAuthClient, PkceGrantEngine, WebGrantEngine,
};
pub use pkce::{CodeVerifier, PkcePair};
pub use token::TokenResponse;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
