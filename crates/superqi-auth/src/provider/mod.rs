//! Identity provider contract.
//!
//! The provider is the mini-app platform's open API.  This service only
//! needs three of its operations: redeem an authorization code, look up the
//! user behind an access token, and list that user's cards.  They are
//! expressed as the [`ProviderClient`] trait so the orchestrator can be
//! exercised against a fake in tests; [`HttpProviderClient`] is the real
//! implementation.
//!
//! Every provider response wraps its payload in an envelope with a
//! [`ProviderResult`].  A `200 OK` whose result code is not `SUCCESS` is a
//! logical failure, and callers must check [`ProviderResult::is_success`].

mod client;
pub mod signer;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

pub use client::HttpProviderClient;

/// Result code the provider uses for a successful call.
pub const RESULT_SUCCESS: &str = "SUCCESS";

// ---------------------------------------------------------------------------
// Opaque values
// ---------------------------------------------------------------------------

/// Single-use authorization code from the mini-app's consent flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    /// Wrap a code, rejecting empty or whitespace-only input.
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            None
        } else {
            Some(Self(code))
        }
    }

    /// The raw code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Provider access token.
///
/// `Debug` and `Display` print a placeholder so the token cannot end up in
/// logs by accident.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building provider requests and sealing.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

/// Logical outcome embedded in every provider response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResult {
    /// Machine-readable code, `SUCCESS` on success.
    pub result_code: String,
    /// `S`, `F`, `U` or `A`.
    #[serde(default)]
    pub result_status: Option<String>,
    /// Human-readable explanation.
    #[serde(default)]
    pub result_message: Option<String>,
}

impl ProviderResult {
    /// Whether the call succeeded at the business level.
    pub fn is_success(&self) -> bool {
        self.result_code == RESULT_SUCCESS
    }

    /// The message if present, otherwise the code.
    pub fn message(&self) -> &str {
        self.result_message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.result_code)
    }
}

/// Response of the token redemption call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    /// Embedded result.
    pub result: ProviderResult,
    /// Present when `result` is a success.
    #[serde(default)]
    pub access_token: Option<AccessToken>,
    /// Provider-side expiry of the access token.
    #[serde(default)]
    pub access_token_expiry_time: Option<String>,
    /// Provider customer id, when the platform returns one.
    #[serde(default)]
    pub customer_id: Option<String>,
}

/// Minimal identity record for the user behind an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityAttributes {
    /// Stable provider user id, used as the credential subject.
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub nick_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub login_id_infos: Vec<LoginIdInfo>,
}

/// A login identifier attached to the user (phone, email, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginIdInfo {
    #[serde(default)]
    pub login_id_type: Option<String>,
    #[serde(default)]
    pub masked_login_id: Option<String>,
}

/// Response of the identity lookup call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityGrant {
    /// Embedded result.
    pub result: ProviderResult,
    /// Present when `result` is a success.
    #[serde(default)]
    pub user_info: Option<IdentityAttributes>,
}

/// Response of the card list call.
///
/// Card entries are passed through untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardListGrant {
    /// Embedded result.
    pub result: ProviderResult,
    #[serde(default)]
    pub card_list: Vec<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures below the business level: the provider could not be reached,
/// or it refused the request outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider refused the authorization code.
    #[error("authorization code rejected: {0}")]
    InvalidCode(String),

    /// The provider refused the access token.
    #[error("access token rejected: {0}")]
    TokenInvalid(String),

    /// Transport failure, timeout, server error or unreadable response.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// The request could not be signed.
    #[error("failed to sign provider request: {0}")]
    Signing(String),
}

// ---------------------------------------------------------------------------
// Client contract
// ---------------------------------------------------------------------------

/// The provider operations this service depends on.
///
/// Every call is a single attempt.  Implementations must not retry: an
/// authorization code can only be redeemed once.
pub trait ProviderClient: Send + Sync + 'static {
    /// Redeem an authorization code for an access token.
    fn redeem_code(
        &self,
        code: &AuthorizationCode,
    ) -> impl Future<Output = Result<TokenGrant, ProviderError>> + Send;

    /// Look up the user an access token belongs to.
    fn fetch_identity(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<IdentityGrant, ProviderError>> + Send;

    /// List the cards of the user an access token belongs to.
    fn fetch_cards(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<CardListGrant, ProviderError>> + Send;
}
