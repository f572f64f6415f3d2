//! End-to-end tests: the auth service and the mock provider both served on
//! localhost, driven over HTTP.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Value, json};
use superqi_auth::config::ProviderConfig;
use superqi_auth::provider::HttpProviderClient;
use superqi_auth::provider::signer::{RequestSigner, SignError};
use superqi_auth::{AppState, router};
use superqi_credential::{Clock, CredentialClaims, CredentialKey, Sealer, UnsealError};

const KEY: [u8; 32] = [0x5A; 32];

/// The mock provider only checks the header shape.
struct StaticSigner;

impl RequestSigner for StaticSigner {
    fn key_version(&self) -> u32 {
        1
    }

    fn sign(&self, _content: &[u8]) -> Result<String, SignError> {
        Ok("dGVzdA==".to_string())
    }
}

struct PastClock;

impl Clock for PastClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() - TimeDelta::days(2)
    }
}

struct Harness {
    base: String,
    http: reqwest::Client,
}

async fn start() -> Harness {
    let provider_addr = mock_provider::spawn().await.unwrap();
    let config = ProviderConfig {
        base_url: format!("http://{provider_addr}"),
        client_id: "2020121000000001".into(),
        private_key: String::new(),
        key_version: 1,
        timeout: Duration::from_secs(5),
    };
    let provider = HttpProviderClient::new(&config, Arc::new(StaticSigner)).unwrap();
    let sealer = Sealer::new(CredentialKey::from_bytes(KEY), TimeDelta::hours(24));
    let app = router(Arc::new(AppState::new(provider, sealer)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Harness {
        base: format!("http://{addr}"),
        http: reqwest::Client::new(),
    }
}

impl Harness {
    async fn apply(&self, body: Value) -> (u16, Value) {
        let res = self
            .http
            .post(format!("{}/api/auth/apply-token", self.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        (res.status().as_u16(), res.json().await.unwrap())
    }

    async fn apply_code(&self, code: &str) -> (u16, Value) {
        self.apply(json!({ "authorization_code": code })).await
    }

    async fn cards(&self, credential: Option<&str>) -> (u16, Value) {
        let mut req = self.http.get(format!("{}/api/user/cards", self.base));
        if let Some(credential) = credential {
            req = req.bearer_auth(credential);
        }
        let res = req.send().await.unwrap();
        (res.status().as_u16(), res.json().await.unwrap())
    }
}

fn unseal(token: &str) -> Result<superqi_credential::UnsealedCredential, UnsealError> {
    Sealer::new(CredentialKey::from_bytes(KEY), TimeDelta::hours(24)).unseal(token)
}

fn error_message(body: &Value) -> &str {
    body["error"].as_str().unwrap()
}

// ---------------------------------------------------------------------------
// apply-token
// ---------------------------------------------------------------------------

#[tokio::test]
async fn authorization_code_becomes_sealed_credential() {
    let h = start().await;

    let (status, body) = h.apply_code("AC123").await;
    assert_eq!(status, 200);

    let token = body["token"].as_str().unwrap();
    let opened = unseal(token).unwrap();
    assert_eq!(opened.claims, CredentialClaims::new("U42", "AT1"));
    assert!(opened.expires_at > Utc::now());
}

#[tokio::test]
async fn legacy_auth_code_field_is_accepted() {
    let h = start().await;
    let (status, body) = h.apply(json!({ "auth_code": "XYZ" })).await;
    assert_eq!(status, 200);

    let opened = unseal(body["token"].as_str().unwrap()).unwrap();
    assert_eq!(opened.claims, CredentialClaims::new("U-XYZ", "mock-token-XYZ"));
}

#[tokio::test]
async fn embedded_failure_is_a_client_error_with_provider_message() {
    let h = start().await;
    let (status, body) = h.apply_code("EXPIRED").await;
    assert_eq!(status, 400);
    assert!(error_message(&body).contains("code expired"));
}

#[tokio::test]
async fn refused_code_is_a_client_error() {
    let h = start().await;
    let (status, body) = h.apply_code("REJECTED").await;
    assert_eq!(status, 400);
    assert!(error_message(&body).contains("authCode is invalid"));
}

#[tokio::test]
async fn provider_outage_is_a_bad_gateway() {
    let h = start().await;
    let (status, _) = h.apply_code("BROKEN").await;
    assert_eq!(status, 502);
}

#[tokio::test]
async fn identity_rejection_is_a_server_error() {
    let h = start().await;
    let (status, body) = h.apply_code("REVOKED").await;
    assert_eq!(status, 500);
    assert!(error_message(&body).contains("access token is invalid"));
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn blank_code_is_an_invalid_request() {
    let h = start().await;
    let (status, body) = h.apply_code("   ").await;
    assert_eq!(status, 400);
    assert!(error_message(&body).starts_with("invalid request"));
}

#[tokio::test]
async fn missing_code_is_an_invalid_request() {
    let h = start().await;
    let (status, body) = h.apply(json!({ "code": "AC123" })).await;
    assert_eq!(status, 400);
    assert!(error_message(&body).starts_with("invalid request"));
}

#[tokio::test]
async fn non_json_body_is_an_invalid_request() {
    let h = start().await;
    let res = h
        .http
        .post(format!("{}/api/auth/apply-token", h.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

// ---------------------------------------------------------------------------
// cards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sealed_credential_unlocks_card_list() {
    let h = start().await;
    let (_, body) = h.apply_code("AC123").await;
    let token = body["token"].as_str().unwrap();

    let (status, body) = h.cards(Some(token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["cards"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn card_list_requires_a_credential() {
    let h = start().await;
    let (status, _) = h.cards(None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn tampered_credential_is_unauthorized() {
    let h = start().await;
    let (_, body) = h.apply_code("AC123").await;
    let token = body["token"].as_str().unwrap();

    // flip one ciphertext byte
    let mut segments: Vec<String> = token.split('.').map(String::from).collect();
    let mut bytes = URL_SAFE_NO_PAD.decode(&segments[3]).unwrap();
    bytes[0] ^= 0x01;
    segments[3] = URL_SAFE_NO_PAD.encode(&bytes);
    let tampered = segments.join(".");

    let (status, body) = h.cards(Some(&tampered)).await;
    assert_eq!(status, 401);
    assert!(error_message(&body).contains("integrity"));
}

#[tokio::test]
async fn expired_credential_is_unauthorized() {
    let h = start().await;
    let stale = Sealer::with_clock(
        CredentialKey::from_bytes(KEY),
        TimeDelta::hours(1),
        Arc::new(PastClock),
    )
    .seal(&CredentialClaims::new("U42", "AT1"))
    .unwrap();

    let (status, body) = h.cards(Some(stale.as_str())).await;
    assert_eq!(status, 401);
    assert!(error_message(&body).contains("expired"));
}

#[tokio::test]
async fn refused_access_token_is_unauthorized() {
    let h = start().await;
    let stale = Sealer::new(CredentialKey::from_bytes(KEY), TimeDelta::hours(1))
        .seal(&CredentialClaims::new("U7", "revoked-token"))
        .unwrap();

    let (status, body) = h.cards(Some(stale.as_str())).await;
    assert_eq!(status, 401);
    assert!(error_message(&body).contains("access token is invalid"));
}

#[tokio::test]
async fn health_check_answers_ok() {
    let h = start().await;
    let res = h.http.get(format!("{}/health", h.base)).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.text().await.unwrap(), "ok");
}
