//! Error types for the `superqi-credential` crate.

/// Errors produced while sealing a claim set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SealError {
    /// A required claim was empty.
    #[error("invalid claims: {0}")]
    InvalidClaims(&'static str),

    /// The claims could not be encoded or encrypted.
    #[error("encryption failed: {0}")]
    Encryption(String),
}

/// Errors produced while unsealing a credential.
///
/// The three kinds are distinct so consumers can tell a stale session
/// (`Expired`) from garbage input (`Malformed`) and from tampering or a key
/// mismatch (`IntegrityFailure`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnsealError {
    /// The credential is authentic but its expiry has passed.
    #[error("credential expired")]
    Expired,

    /// The credential is not a well-formed sealed token.
    #[error("malformed credential: {0}")]
    Malformed(&'static str),

    /// Authentication of the ciphertext failed.
    #[error("credential integrity check failed")]
    IntegrityFailure,
}
