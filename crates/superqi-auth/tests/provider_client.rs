//! `HttpProviderClient` against the mock provider over a real socket.

use std::sync::Arc;
use std::time::Duration;

use rsa::RsaPrivateKey;
use superqi_auth::config::ProviderConfig;
use superqi_auth::provider::signer::RsaSha256Signer;
use superqi_auth::provider::{
    AccessToken, AuthorizationCode, HttpProviderClient, ProviderClient, ProviderError,
};

fn config(base_url: String) -> ProviderConfig {
    ProviderConfig {
        base_url,
        client_id: "2020121000000001".into(),
        private_key: String::new(),
        key_version: 1,
        timeout: Duration::from_secs(5),
    }
}

async fn client() -> HttpProviderClient {
    let addr = mock_provider::spawn().await.unwrap();
    let key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
    let signer = RsaSha256Signer::new(key, 1);
    HttpProviderClient::new(&config(format!("http://{addr}")), Arc::new(signer)).unwrap()
}

fn code(raw: &str) -> AuthorizationCode {
    AuthorizationCode::new(raw).unwrap()
}

#[tokio::test]
async fn redeem_identity_and_cards() {
    let client = client().await;

    let grant = client.redeem_code(&code("AC123")).await.unwrap();
    assert!(grant.result.is_success());
    let token = grant.access_token.unwrap();
    assert_eq!(token.expose(), "AT1");

    let identity = client.fetch_identity(&token).await.unwrap();
    assert!(identity.result.is_success());
    let user = identity.user_info.unwrap();
    assert_eq!(user.user_id, "U42");
    assert_eq!(user.login_id_infos.len(), 1);

    let cards = client.fetch_cards(&token).await.unwrap();
    assert!(cards.result.is_success());
    assert_eq!(cards.card_list.len(), 2);
}

#[tokio::test]
async fn embedded_failure_is_returned_as_data() {
    let client = client().await;
    let grant = client.redeem_code(&code("EXPIRED")).await.unwrap();
    assert!(!grant.result.is_success());
    assert_eq!(grant.result.message(), "code expired");
    assert!(grant.access_token.is_none());
}

#[tokio::test]
async fn refused_code_is_invalid_code() {
    let client = client().await;
    let err = client.redeem_code(&code("REJECTED")).await.unwrap_err();
    assert_eq!(err, ProviderError::InvalidCode("authCode is invalid".into()));
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let client = client().await;
    let err = client.redeem_code(&code("BROKEN")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)));
}

#[tokio::test]
async fn revoked_token_fails_identity_lookup() {
    let client = client().await;
    let grant = client.redeem_code(&code("REVOKED")).await.unwrap();
    let token = grant.access_token.unwrap();

    let identity = client.fetch_identity(&token).await.unwrap();
    assert_eq!(identity.result.result_code, "INVALID_ACCESS_TOKEN");
    assert!(identity.user_info.is_none());
}

#[tokio::test]
async fn unreachable_provider_is_unavailable() {
    let client = HttpProviderClient::new(
        &config("http://127.0.0.1:1".into()),
        Arc::new(RsaSha256Signer::new(
            RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap(),
            1,
        )),
    )
    .unwrap();

    let err = client
        .fetch_identity(&AccessToken::new("AT1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)));
}
