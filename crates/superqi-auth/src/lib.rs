//! SuperQi auth service: exchanges mini-app authorization codes for sealed
//! session credentials.
//!
//! On each `POST /api/auth/apply-token` the service:
//!
//! 1. Redeems the authorization code with the provider for an access token.
//! 2. Looks up the user the access token belongs to.
//! 3. Seals `{user id, access token}` into an encrypted credential and
//!    returns it to the mini-app.
//!
//! Nothing is stored server-side.  Any backend holding the shared key can
//! unseal the credential and call the provider on the user's behalf, which
//! `GET /api/user/cards` does for the card list.

pub mod api;
pub mod config;
pub mod error;
pub mod exchange;
pub mod provider;

pub use api::{AppState, router};
pub use config::AppConfig;
pub use error::AuthError;
