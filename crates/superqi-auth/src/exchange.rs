//! Authorization-code exchange.
//!
//! One [`Exchange`] runs per request and moves strictly forward:
//!
//! ```text
//! Start ──redeem_code──▶ TokenAcquired ──fetch_identity──▶ IdentityAcquired ──seal──▶ Sealed
//!   │                        │                                 │
//!   └──────────────▶ Failed ◀┴─────────────────────────────────┘
//! ```
//!
//! There is no retry at any step.  The authorization code is consumed by
//! the first provider call, so recovering from a later failure needs a
//! fresh code from the caller.

use std::fmt;

use superqi_credential::{CredentialClaims, SealedCredential, Sealer};
use tracing::{info, warn};

use crate::error::AuthError;
use crate::provider::{AuthorizationCode, ProviderClient};

/// Stage an exchange reached, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing done yet; the code is about to be redeemed.
    Start,
    /// The provider issued an access token.
    TokenAcquired,
    /// The user behind the access token is known.
    IdentityAcquired,
    /// The credential has been sealed.
    Sealed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::TokenAcquired => "token_acquired",
            Self::IdentityAcquired => "identity_acquired",
            Self::Sealed => "sealed",
        })
    }
}

/// Exchanges one authorization code for a sealed credential.
///
/// Borrows the process-wide provider client and sealer; holds no state of
/// its own beyond the current request.
pub struct Exchange<'a, P> {
    provider: &'a P,
    sealer: &'a Sealer,
}

impl<'a, P: ProviderClient> Exchange<'a, P> {
    /// Prepare an exchange against `provider`, sealing with `sealer`.
    pub fn new(provider: &'a P, sealer: &'a Sealer) -> Self {
        Self { provider, sealer }
    }

    /// Run the exchange to completion.
    ///
    /// The access token lives only inside this future and is never logged.
    #[tracing::instrument(name = "exchange", skip_all)]
    pub async fn run(self, code: AuthorizationCode) -> Result<SealedCredential, AuthError> {
        // 1. Redeem the code
        info!(stage = %Stage::Start, "redeeming authorization code");
        let grant = self.provider.redeem_code(&code).await?;

        // 2. Transport success is not enough, check the embedded result
        if !grant.result.is_success() {
            warn!(
                stage = %Stage::Start,
                call = "redeem_code",
                result_code = %grant.result.result_code,
                "provider rejected authorization code"
            );
            return Err(AuthError::ProviderRejected(grant.result.message().to_string()));
        }
        let access_token = grant.access_token.ok_or_else(|| {
            AuthError::ProviderRejected("provider returned no access token".into())
        })?;
        info!(stage = %Stage::TokenAcquired, "access token acquired");

        // 3. Resolve the user behind the token
        let identity = self.provider.fetch_identity(&access_token).await?;
        if !identity.result.is_success() {
            warn!(
                stage = %Stage::TokenAcquired,
                call = "fetch_identity",
                result_code = %identity.result.result_code,
                "provider rejected identity lookup"
            );
            return Err(AuthError::TokenInvalid(identity.result.message().to_string()));
        }
        let user_id = identity
            .user_info
            .map(|info| info.user_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::TokenInvalid("provider returned no user id".into()))?;
        info!(stage = %Stage::IdentityAcquired, user_id = %user_id, "identity acquired");

        // 4. Seal
        let claims = CredentialClaims::new(user_id, access_token.expose());
        let sealed = self.sealer.seal(&claims)?;
        info!(
            stage = %Stage::Sealed,
            user_id = %claims.subject,
            ttl_secs = self.sealer.ttl().num_seconds(),
            "credential issued"
        );

        Ok(sealed)
    }
}
