//! HTTP implementation of [`ProviderClient`].

use std::sync::Arc;

use chrono::SecondsFormat;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use superqi_credential::{Clock, SystemClock};
use tracing::debug;

use super::signer::{RequestSigner, signature_header, signing_content};
use super::{
    AccessToken, AuthorizationCode, CardListGrant, IdentityGrant, ProviderClient, ProviderError,
    ProviderResult, TokenGrant,
};
use crate::config::ProviderConfig;

const APPLY_TOKEN_PATH: &str = "/v1/authorizations/applyToken";
const INQUIRY_USER_INFO_PATH: &str = "/v1/users/inquiryUserInfo";
const INQUIRY_USER_CARD_LIST_PATH: &str = "/v1/users/inquiryUserCardList";

const GRANT_TYPE_AUTHORIZATION_CODE: &str = "AUTHORIZATION_CODE";

/// Calls the provider's open API over HTTPS.
///
/// Built once at startup; the underlying `reqwest::Client` pools
/// connections and carries the configured timeout.
pub struct HttpProviderClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    signer: Arc<dyn RequestSigner>,
    clock: Arc<dyn Clock>,
}

impl HttpProviderClient {
    /// Build a client for the configured provider.
    pub fn new(
        config: &ProviderConfig,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self, reqwest::Error> {
        Self::with_clock(config, signer, Arc::new(SystemClock))
    }

    /// Build a client with an explicit time source for `Request-Time`.
    pub fn with_clock(
        config: &ProviderConfig,
        signer: Arc<dyn RequestSigner>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            signer,
            clock,
        })
    }

    /// Headers authenticating a `POST` of `body` to `path`.
    fn auth_headers(&self, path: &str, body: &str) -> Result<HeaderMap, ProviderError> {
        let request_time = self
            .clock
            .now()
            .to_rfc3339_opts(SecondsFormat::Secs, false);
        let content = signing_content("POST", path, &self.client_id, &request_time, body);
        let signature = self
            .signer
            .sign(content.as_bytes())
            .map_err(|e| ProviderError::Signing(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=UTF-8"),
        );
        headers.insert("client-id", header_value(&self.client_id)?);
        headers.insert("request-time", header_value(&request_time)?);
        headers.insert(
            "signature",
            header_value(&signature_header(self.signer.key_version(), &signature))?,
        );
        Ok(headers)
    }

    /// Sign and send one request, then decode the envelope.
    ///
    /// `rejected` builds the error for a 4xx answer, which means the
    /// provider refused the credential in the request body.
    async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
        rejected: fn(String) -> ProviderError,
    ) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_string(body)
            .map_err(|e| ProviderError::Unavailable(format!("failed to encode request: {e}")))?;
        let headers = self.auth_headers(path, &body)?;

        let res = self
            .http
            .post(format!("{}{path}", self.base_url))
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        debug!(%status, path, "provider responded");

        if status.is_client_error() {
            let message = envelope_message(&bytes)
                .unwrap_or_else(|| format!("provider returned {status}"));
            return Err(rejected(message));
        }
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "provider returned {status}"
            )));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::Unavailable(format!("invalid provider response: {e}")))
    }
}

impl ProviderClient for HttpProviderClient {
    async fn redeem_code(&self, code: &AuthorizationCode) -> Result<TokenGrant, ProviderError> {
        let body = json!({
            "grantType": GRANT_TYPE_AUTHORIZATION_CODE,
            "authCode": code.as_str(),
        });
        self.post(APPLY_TOKEN_PATH, &body, ProviderError::InvalidCode)
            .await
    }

    async fn fetch_identity(&self, token: &AccessToken) -> Result<IdentityGrant, ProviderError> {
        let body = json!({ "accessToken": token.expose() });
        self.post(INQUIRY_USER_INFO_PATH, &body, ProviderError::TokenInvalid)
            .await
    }

    async fn fetch_cards(&self, token: &AccessToken) -> Result<CardListGrant, ProviderError> {
        let body = json!({ "accessToken": token.expose() });
        self.post(INQUIRY_USER_CARD_LIST_PATH, &body, ProviderError::TokenInvalid)
            .await
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(value)
        .map_err(|e| ProviderError::Signing(format!("invalid header value: {e}")))
}

/// Best-effort extraction of `result.resultMessage` from an error body.
fn envelope_message(body: &[u8]) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct Envelope {
        result: ProviderResult,
    }

    serde_json::from_slice::<Envelope>(body)
        .ok()
        .map(|e| e.result.message().to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::provider::signer::SignError;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp(1_760_000_000, 0).unwrap()
        }
    }

    /// Records what it was asked to sign and returns a fixed signature.
    #[derive(Default)]
    struct RecordingSigner {
        seen: Mutex<Vec<String>>,
    }

    impl RequestSigner for RecordingSigner {
        fn key_version(&self) -> u32 {
            7
        }

        fn sign(&self, content: &[u8]) -> Result<String, SignError> {
            self.seen
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(content).into_owned());
            Ok("c2ln+/==".to_string())
        }
    }

    fn config() -> ProviderConfig {
        ProviderConfig {
            base_url: "https://provider.example/api/".into(),
            client_id: "2020121000000001".into(),
            private_key: String::new(),
            key_version: 7,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn auth_headers_are_computed_from_payload_and_time() {
        let signer = Arc::new(RecordingSigner::default());
        let client =
            HttpProviderClient::with_clock(&config(), signer.clone(), Arc::new(FixedClock))
                .unwrap();

        let headers = client
            .auth_headers(APPLY_TOKEN_PATH, r#"{"authCode":"AC123"}"#)
            .unwrap();

        assert_eq!(headers["client-id"], "2020121000000001");
        assert_eq!(headers["request-time"], "2025-10-09T08:53:20+00:00");
        assert_eq!(
            headers["signature"],
            "algorithm=RSA256, keyVersion=7, signature=c2ln%2B%2F%3D%3D"
        );
        assert_eq!(
            signer.seen.lock().unwrap().as_slice(),
            ["POST /v1/authorizations/applyToken\n2020121000000001.2025-10-09T08:53:20+00:00.{\"authCode\":\"AC123\"}"]
        );
    }

    #[test]
    fn every_request_is_signed_again() {
        let signer = Arc::new(RecordingSigner::default());
        let client =
            HttpProviderClient::with_clock(&config(), signer.clone(), Arc::new(FixedClock))
                .unwrap();

        client.auth_headers(INQUIRY_USER_INFO_PATH, "{}").unwrap();
        client.auth_headers(INQUIRY_USER_INFO_PATH, "{}").unwrap();
        assert_eq!(signer.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client =
            HttpProviderClient::new(&config(), Arc::new(RecordingSigner::default())).unwrap();
        assert_eq!(client.base_url, "https://provider.example/api");
    }

    #[test]
    fn envelope_message_reads_result() {
        let body = br#"{"result":{"resultCode":"INVALID_AUTH_CODE","resultStatus":"F","resultMessage":"authCode is invalid"}}"#;
        assert_eq!(envelope_message(body).as_deref(), Some("authCode is invalid"));
        assert_eq!(envelope_message(b"<html>"), None);
    }
}
