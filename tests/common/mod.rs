use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use grantflow::clock::ManualClock;
use grantflow::config::ClientOptions;
use grantflow::credential::{Credential, GrantType};
use grantflow::grant::OAuthClient;
use grantflow::transport::ReqwestTransport;

#[allow(dead_code)]
pub const PRIVATE_PEM: &str = include_str!("../fixtures/test_rsa_private.pem");
#[allow(dead_code)]
pub const PUBLIC_PEM: &str = include_str!("../fixtures/test_rsa_public.pem");

/// Fixed instant used as the starting point of manual clocks.
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
}

/// Builds a credential of `grant_type` whose endpoints point at `base_url`.
#[allow(dead_code)]
pub fn credential(grant_type: GrantType, base_url: &str) -> Credential {
    let builder = Credential::builder(grant_type, "test-client-id").authorization_base_url(base_url);
    let builder = match grant_type {
        GrantType::Web => builder.client_secret("test-client-secret"),
        GrantType::Jwt => builder
            .private_key_pem(PRIVATE_PEM)
            .public_key_id("test-kid"),
        GrantType::Device | GrantType::Pkce => builder,
    };
    builder.build().expect("valid test credential")
}

/// Builds a client over a real reqwest transport and a manual clock.
#[allow(dead_code)]
pub fn client(credential: Credential, clock: Arc<ManualClock>) -> OAuthClient {
    let options = ClientOptions::default();
    let transport =
        ReqwestTransport::new(options.timeout(), &options.user_agent).expect("reqwest transport");
    OAuthClient::with_parts(credential, Arc::new(transport), clock, options).expect("client")
}

/// Writes `contents` to `name` inside a fresh temp dir.
#[allow(dead_code)]
pub fn temp_config_file(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join(name);
    std::fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Minimal token endpoint reply.
#[allow(dead_code)]
pub fn token_body(access: &str, refresh: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = serde_json::Value::String(refresh.to_string());
    }
    body
}

/// Returns the first value of header `name` on a recorded request.
#[allow(dead_code)]
pub fn header_value(request: &wiremock::Request, name: &str) -> Option<String> {
    request
        .headers
        .iter()
        .find(|(header, _)| header.as_str().eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.iter().next().map(|v| v.as_str().to_string()))
}
