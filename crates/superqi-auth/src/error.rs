//! Error types for the SuperQi auth service.
//!
//! [`AuthError`] unifies all failure modes and implements [`axum::response::IntoResponse`]
//! so handlers can return `Result<…, AuthError>` directly.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use superqi_credential::{SealError, UnsealError};

use crate::provider::ProviderError;

/// Errors that can occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The inbound payload is malformed or incomplete.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provider refused the authorization code at the transport level.
    #[error("invalid authorization code: {0}")]
    InvalidCode(String),

    /// The provider answered but signalled a logical failure.
    #[error("provider rejected the request: {0}")]
    ProviderRejected(String),

    /// The provider could not be reached or answered with a server error.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider refused the access token during a follow-up call.
    #[error("access token rejected: {0}")]
    TokenInvalid(String),

    /// The credential could not be sealed.
    #[error("failed to issue credential: {0}")]
    SealingFailure(#[from] SealError),

    /// The presented credential is missing, expired or not authentic.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl From<ProviderError> for AuthError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::InvalidCode(m) => Self::InvalidCode(m),
            ProviderError::TokenInvalid(m) => Self::TokenInvalid(m),
            ProviderError::Unavailable(m) => Self::ProviderUnavailable(m),
            ProviderError::Signing(m) => {
                Self::ProviderUnavailable(format!("failed to sign provider request: {m}"))
            }
        }
    }
}

impl From<UnsealError> for AuthError {
    fn from(e: UnsealError) -> Self {
        Self::Unauthorized(e.to_string())
    }
}

impl AuthError {
    /// HTTP status reported to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidCode(_) | Self::ProviderRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::TokenInvalid(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SealingFailure(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::warn!(%status, error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
