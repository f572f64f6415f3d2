//! Claim sets carried by a sealed credential.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The claims a caller asks the [`Sealer`](crate::Sealer) to protect.
///
/// `Debug` never prints the access token.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialClaims {
    /// Provider user id the credential was issued for.
    pub subject: String,
    /// Provider access token, usable against the provider's user APIs.
    pub access_token: String,
}

impl CredentialClaims {
    /// Build a claim set from a subject and an access token.
    pub fn new(subject: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for CredentialClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialClaims")
            .field("subject", &self.subject)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// An authentic, unexpired credential after [`Sealer::unseal`](crate::Sealer::unseal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsealedCredential {
    /// The claims that were sealed.
    pub claims: CredentialClaims,
    /// When the credential was issued.
    pub issued_at: DateTime<Utc>,
    /// When the credential stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Unique credential id (`jti`).
    pub id: Uuid,
}
