//! Integration tests for the authorization code grants (PKCE and web)
//!
//! Tests verify:
//! - Consent URLs carry PKCE parameters only for PKCE clients
//! - Code exchange request bodies and authentication headers
//! - Rejected codes map to `InvalidGrant`
//! - Refresh token rotation and absolute expiry computation

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use grantflow::clock::ManualClock;
use grantflow::credential::GrantType;
use grantflow::error::OAuthError;
use grantflow::pkce::{self, CodeVerifier};
use grantflow::types::{AuthorizationCode, RefreshToken};

const TOKEN_PATH: &str = "/api/permission/oauth2/token";
const REDIRECT_URI: &str = "http://localhost:8080/callback";

fn query_map(url: &url::Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

async fn last_body(server: &MockServer) -> serde_json::Value {
    let requests = server.received_requests().await.unwrap();
    let last = requests.last().expect("at least one request");
    serde_json::from_slice(&last.body).unwrap()
}

// ---------------------------------------------------------------------------
// Consent URLs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pkce_authorization_url_includes_challenge() {
    let clock = Arc::new(ManualClock::new(common::t0()));
    let client = common::client(
        common::credential(GrantType::Pkce, "https://api.coze.com"),
        clock,
    );
    let engine = client.as_pkce().unwrap();

    let pair = pkce::generate();
    let url = engine
        .authorization_url(REDIRECT_URI, "state-123", &pair.challenge)
        .unwrap();

    assert_eq!(url.host_str(), Some("www.coze.com"));
    assert_eq!(url.path(), "/api/permission/oauth2/authorize");
    let query = query_map(&url);
    assert_eq!(query["response_type"], "code");
    assert_eq!(query["client_id"], "test-client-id");
    assert_eq!(query["redirect_uri"], REDIRECT_URI);
    assert_eq!(query["state"], "state-123");
    assert_eq!(query["code_challenge"], pair.challenge);
    assert_eq!(query["code_challenge_method"], "S256");
    assert!(!url.as_str().contains(pair.verifier.secret()));
}

#[tokio::test]
async fn test_web_authorization_url_has_no_pkce_params() {
    let clock = Arc::new(ManualClock::new(common::t0()));
    let client = common::client(
        common::credential(GrantType::Web, "https://api.coze.com"),
        clock,
    );

    let url = client
        .as_web()
        .unwrap()
        .authorization_url(REDIRECT_URI, "state-xyz")
        .unwrap();

    let query = query_map(&url);
    assert_eq!(query["state"], "state-xyz");
    assert!(!query.contains_key("code_challenge"));
    assert!(!query.contains_key("code_challenge_method"));
    assert!(!url.as_str().contains("test-client-secret"));
}

#[tokio::test]
async fn test_start_authorization_states_are_unique() {
    let clock = Arc::new(ManualClock::new(common::t0()));
    let client = common::client(
        common::credential(GrantType::Pkce, "https://api.coze.com"),
        clock,
    );
    let engine = client.as_pkce().unwrap();

    let first = engine.start_authorization(REDIRECT_URI).unwrap();
    let second = engine.start_authorization(REDIRECT_URI).unwrap();

    assert_ne!(first.state, second.state);
    assert_ne!(first.verifier.secret(), second.verifier.secret());
    assert_eq!(query_map(&first.url)["code_challenge"], first.verifier.challenge());
}

// ---------------------------------------------------------------------------
// Code exchange
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pkce_exchange_sends_verifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::token_body("pkce-access", Some("pkce-refresh"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(common::t0()));
    let client = common::client(common::credential(GrantType::Pkce, &server.uri()), clock);
    let engine = client.as_pkce().unwrap();

    let pair = pkce::generate();
    let verifier_text = pair.verifier.secret().to_string();
    let token = engine
        .exchange_code(AuthorizationCode::new("auth-code-1"), REDIRECT_URI, pair.verifier)
        .await
        .unwrap();

    assert_eq!(token.access_token.secret(), "pkce-access");
    assert_eq!(token.expires_at, common::t0() + Duration::seconds(3600));

    let body = last_body(&server).await;
    assert_eq!(body["grant_type"], "authorization_code");
    assert_eq!(body["code"], "auth-code-1");
    assert_eq!(body["redirect_uri"], REDIRECT_URI);
    assert_eq!(body["client_id"], "test-client-id");
    assert_eq!(body["code_verifier"], verifier_text.as_str());

    let requests = server.received_requests().await.unwrap();
    assert!(common::header_value(&requests[0], "authorization").is_none());
}

#[tokio::test]
async fn test_web_exchange_authenticates_with_secret() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("authorization", "Bearer test-client-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::token_body("web-access", None)))
        .expect(1)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(common::t0()));
    let client = common::client(common::credential(GrantType::Web, &server.uri()), clock);

    let token = client
        .as_web()
        .unwrap()
        .exchange_code(AuthorizationCode::new("web-code"), REDIRECT_URI)
        .await
        .unwrap();

    assert_eq!(token.access_token.secret(), "web-access");
    assert!(token.refresh_token.is_none());
    let body = last_body(&server).await;
    assert_eq!(body["code"], "web-code");
    assert!(body.get("code_verifier").is_none());
}

#[tokio::test]
async fn test_exchange_rejected_code_is_invalid_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "code already used"
        })))
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(common::t0()));
    let client = common::client(common::credential(GrantType::Pkce, &server.uri()), clock);

    let err = client
        .as_pkce()
        .unwrap()
        .exchange_code(
            AuthorizationCode::new("used-code"),
            REDIRECT_URI,
            CodeVerifier::new("a".repeat(43)).unwrap(),
        )
        .await
        .unwrap_err();

    match &err {
        OAuthError::InvalidGrant {
            grant_type,
            error_code,
            description,
            ..
        } => {
            assert_eq!(*grant_type, GrantType::Pkce);
            assert_eq!(error_code, "invalid_grant");
            assert_eq!(description.as_deref(), Some("code already used"));
        }
        other => panic!("expected InvalidGrant, got {other:?}"),
    }
    assert!(!err.to_string().contains("aaaaaaaaaa"));
}

#[tokio::test]
async fn test_exchange_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(common::t0()));
    let client = common::client(common::credential(GrantType::Web, &server.uri()), clock);

    let err = client
        .as_web()
        .unwrap()
        .exchange_code(AuthorizationCode::new("code"), REDIRECT_URI)
        .await
        .unwrap_err();

    assert!(matches!(err, OAuthError::Server { status: 503, .. }), "got {err:?}");
    assert!(err.is_retryable());
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_refresh_rotation_rejects_old_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::token_body("access-2", Some("refresh-2"))),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_code": "invalid_grant",
            "error_message": "refresh token already used"
        })))
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(common::t0()));
    let client = common::client(
        common::credential(GrantType::Pkce, &server.uri()),
        clock.clone(),
    );
    let old = RefreshToken::new("refresh-1");

    clock.advance(Duration::seconds(120));
    let rotated = client.refresh(&old).await.unwrap();
    assert_eq!(rotated.access_token.secret(), "access-2");
    assert_eq!(
        rotated.refresh_token.as_ref().map(|t| t.secret()),
        Some("refresh-2")
    );
    assert_eq!(
        rotated.expires_at,
        common::t0() + Duration::seconds(120) + Duration::seconds(3600)
    );

    let body = last_body(&server).await;
    assert_eq!(body["grant_type"], "refresh_token");
    assert_eq!(body["refresh_token"], "refresh-1");
    assert_eq!(body["client_id"], "test-client-id");

    let err = client.refresh(&old).await.unwrap_err();
    assert!(matches!(err, OAuthError::InvalidGrant { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_web_refresh_uses_client_secret() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("authorization", "Bearer test-client-secret"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::token_body("web-access-2", Some("web-refresh-2"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(common::t0()));
    let client = common::client(common::credential(GrantType::Web, &server.uri()), clock);

    let token = client.refresh(&RefreshToken::new("web-refresh-1")).await.unwrap();
    assert_eq!(token.access_token.secret(), "web-access-2");
}

#[tokio::test]
async fn test_absolute_expires_in_is_kept() {
    let server = MockServer::start().await;
    let absolute = common::t0().timestamp() + 7200;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abs-access",
            "token_type": "Bearer",
            "expires_in": absolute
        })))
        .mount(&server)
        .await;

    let clock = Arc::new(ManualClock::new(common::t0()));
    let client = common::client(common::credential(GrantType::Pkce, &server.uri()), clock);

    let token = client.refresh(&RefreshToken::new("r")).await.unwrap();
    assert_eq!(token.expires_at.timestamp(), absolute);
}
