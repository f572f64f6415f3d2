//! Mock mini-app provider.
//!
//! Implements the three open API endpoints the auth service calls, with a
//! few magic authorization codes to drive failure paths:
//!
//! | Code       | Behaviour                                               |
//! |------------|---------------------------------------------------------|
//! | `AC123`    | Access token `AT1` for user `U42`                       |
//! | `EXPIRED`  | `200` with result `FAIL` / `code expired`               |
//! | `REJECTED` | `400` with result `INVALID_AUTH_CODE`                   |
//! | `BROKEN`   | `500`                                                   |
//! | `REVOKED`  | Token is issued but the identity lookup rejects it      |
//! | other      | Token `mock-token-{code}` for user `U-{code}`           |
//!
//! Requests without `client-id`, `request-time` and an `RSA256` signature
//! header get a `401`.  The signature itself is not verified.

use std::net::SocketAddr;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

const TOKEN_PREFIX: &str = "mock-token-";
const REVOKED_TOKEN: &str = "revoked-token";

type Reply = (StatusCode, Json<Value>);

/// Router serving the mock open API.
pub fn router() -> Router {
    Router::new()
        .route("/v1/authorizations/applyToken", post(apply_token))
        .route("/v1/users/inquiryUserInfo", post(inquiry_user_info))
        .route("/v1/users/inquiryUserCardList", post(inquiry_user_card_list))
}

/// Serve the mock on an ephemeral localhost port and return its address.
///
/// The server runs on a background task for the rest of the runtime's life.
pub async fn spawn() -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router()).await {
            error!(error = %e, "mock provider stopped");
        }
    });
    Ok(addr)
}

// --- Endpoints ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplyTokenRequest {
    grant_type: String,
    auth_code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenRequest {
    access_token: String,
}

async fn apply_token(headers: HeaderMap, Json(req): Json<ApplyTokenRequest>) -> Reply {
    if let Err(reply) = check_signature(&headers) {
        return reply;
    }
    info!(auth_code = %req.auth_code, "applyToken");

    if req.grant_type != "AUTHORIZATION_CODE" {
        return failure(StatusCode::BAD_REQUEST, "PARAM_ILLEGAL", "unsupported grantType");
    }

    let access_token = match req.auth_code.as_str() {
        "EXPIRED" => return failure(StatusCode::OK, "FAIL", "code expired"),
        "REJECTED" => {
            return failure(
                StatusCode::BAD_REQUEST,
                "INVALID_AUTH_CODE",
                "authCode is invalid",
            )
        }
        "BROKEN" => {
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "SYSTEM_ERROR",
                "system error",
            )
        }
        "AC123" => "AT1".to_string(),
        "REVOKED" => REVOKED_TOKEN.to_string(),
        other => format!("{TOKEN_PREFIX}{other}"),
    };

    success(json!({
        "accessToken": access_token,
        "accessTokenExpiryTime": "2099-01-01T00:00:00+03:00",
        "refreshToken": format!("refresh-{access_token}"),
        "refreshTokenExpiryTime": "2099-01-01T00:00:00+03:00",
    }))
}

async fn inquiry_user_info(headers: HeaderMap, Json(req): Json<AccessTokenRequest>) -> Reply {
    if let Err(reply) = check_signature(&headers) {
        return reply;
    }
    let Some(user_id) = user_for_token(&req.access_token) else {
        return invalid_token();
    };
    info!(user_id = %user_id, "inquiryUserInfo");

    success(json!({
        "userInfo": {
            "userId": user_id,
            "nickName": format!("User {user_id}"),
            "avatar": "https://example.com/avatar.png",
            "gender": "M",
            "loginIdInfos": [
                { "loginIdType": "MOBILE_PHONE", "maskedLoginId": "964****0042" }
            ]
        }
    }))
}

async fn inquiry_user_card_list(
    headers: HeaderMap,
    Json(req): Json<AccessTokenRequest>,
) -> Reply {
    if let Err(reply) = check_signature(&headers) {
        return reply;
    }
    let Some(user_id) = user_for_token(&req.access_token) else {
        return invalid_token();
    };
    info!(user_id = %user_id, "inquiryUserCardList");

    success(json!({
        "cardList": [
            { "maskedCardNo": "6262****1234", "cardType": "DEBIT", "currency": "IQD" },
            { "maskedCardNo": "6262****5678", "cardType": "PREPAID", "currency": "USD" }
        ]
    }))
}

// --- Helpers ---

fn user_for_token(token: &str) -> Option<String> {
    match token {
        "AT1" => Some("U42".to_string()),
        REVOKED_TOKEN => None,
        other => other
            .strip_prefix(TOKEN_PREFIX)
            .map(|code| format!("U-{code}")),
    }
}

fn check_signature(headers: &HeaderMap) -> Result<(), Reply> {
    let present = |name: &str| headers.get(name).is_some_and(|v| !v.is_empty());
    let signed = headers
        .get("signature")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("algorithm=RSA256") && v.contains("signature="));

    if present("client-id") && present("request-time") && signed {
        Ok(())
    } else {
        Err(failure(
            StatusCode::UNAUTHORIZED,
            "INVALID_SIGNATURE",
            "signature is missing or malformed",
        ))
    }
}

fn success(mut body: Value) -> Reply {
    body["result"] = json!({
        "resultCode": "SUCCESS",
        "resultStatus": "S",
        "resultMessage": "success",
    });
    (StatusCode::OK, Json(body))
}

fn failure(status: StatusCode, code: &str, message: &str) -> Reply {
    (
        status,
        Json(json!({
            "result": {
                "resultCode": code,
                "resultStatus": "F",
                "resultMessage": message,
            }
        })),
    )
}

fn invalid_token() -> Reply {
    failure(
        StatusCode::OK,
        "INVALID_ACCESS_TOKEN",
        "access token is invalid",
    )
}
