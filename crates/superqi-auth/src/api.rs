//! HTTP surface of the auth service.

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use superqi_credential::Sealer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AuthError;
use crate::exchange::Exchange;
use crate::provider::{AccessToken, AuthorizationCode, ProviderClient, ProviderError};

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// State shared across all Axum handlers.
///
/// Both members are built once at startup and only read afterwards.
pub struct AppState<P> {
    /// Client for the identity provider's open API.
    pub provider: P,
    /// Seals and unseals session credentials with the shared key.
    pub sealer: Sealer,
}

impl<P> AppState<P> {
    pub fn new(provider: P, sealer: Sealer) -> Self {
        Self { provider, sealer }
    }
}

// ---------------------------------------------------------------------------
// Request / Response DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /api/auth/apply-token`.
#[derive(Deserialize)]
pub struct ApplyTokenRequest {
    /// Authorization code obtained by the mini-app from `my.getAuthCode`.
    #[serde(alias = "auth_code")]
    pub authorization_code: String,
}

/// Response of `POST /api/auth/apply-token`.
#[derive(Serialize)]
pub struct ApplyTokenResponse {
    /// Sealed session credential.
    pub token: String,
}

/// Response of `GET /api/user/cards`.
#[derive(Serialize)]
pub struct CardsResponse {
    pub cards: Vec<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the service router.
pub fn router<P: ProviderClient>(state: Arc<AppState<P>>) -> Router {
    Router::new()
        .route("/api/auth/apply-token", post(apply_token::<P>))
        .route("/api/user/cards", get(user_cards::<P>))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /api/auth/apply-token`: exchange an authorization code for a
/// sealed credential.
async fn apply_token<P: ProviderClient>(
    State(state): State<Arc<AppState<P>>>,
    payload: Result<Json<ApplyTokenRequest>, JsonRejection>,
) -> Result<Json<ApplyTokenResponse>, AuthError> {
    let Json(req) = payload.map_err(|e| AuthError::InvalidRequest(e.body_text()))?;
    let code = AuthorizationCode::new(req.authorization_code).ok_or_else(|| {
        AuthError::InvalidRequest("authorization_code must not be empty".into())
    })?;

    let sealed = Exchange::new(&state.provider, &state.sealer)
        .run(code)
        .await?;

    Ok(Json(ApplyTokenResponse {
        token: sealed.into_string(),
    }))
}

/// `GET /api/user/cards`: list the caller's cards using the access token
/// inside their credential.
///
/// Both a bad credential and an access token the provider no longer
/// accepts are `401`.
async fn user_cards<P: ProviderClient>(
    State(state): State<Arc<AppState<P>>>,
    headers: HeaderMap,
) -> Result<Json<CardsResponse>, AuthError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AuthError::Unauthorized("missing bearer credential".into()))?;
    let credential = state.sealer.unseal(token)?;

    // A refused token means the session behind the credential is stale.
    let access_token = AccessToken::new(credential.claims.access_token);
    let grant = state
        .provider
        .fetch_cards(&access_token)
        .await
        .map_err(|e| match e {
            ProviderError::TokenInvalid(message) => AuthError::Unauthorized(message),
            other => AuthError::from(other),
        })?;
    if !grant.result.is_success() {
        return Err(AuthError::Unauthorized(grant.result.message().to_string()));
    }

    info!(
        user_id = %credential.claims.subject,
        cards = grant.card_list.len(),
        "card list served"
    );
    Ok(Json(CardsResponse {
        cards: grant.card_list,
    }))
}

/// `GET /health`: liveness probe.
async fn health() -> &'static str {
    "ok"
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
