//! Sealing and unsealing of session credentials.
//!
//! [`Sealer`] turns a [`CredentialClaims`] into a JWE compact string and
//! back.  The sealer owns the cipher built from the shared key and is meant
//! to be constructed once at startup and shared behind an `Arc`.

use std::fmt;
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeDelta, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claims::{CredentialClaims, UnsealedCredential};
use crate::clock::{Clock, SystemClock};
use crate::error::{SealError, UnsealError};
use crate::key::CredentialKey;

/// Protected header of every credential.
const PROTECTED_HEADER: &str = r#"{"alg":"dir","enc":"A256GCM","typ":"JWT"}"#;
const ALG_DIR: &str = "dir";
const ENC_A256GCM: &str = "A256GCM";

/// AES-GCM nonce length in bytes.
const IV_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// JSON plaintext inside the ciphertext.
#[derive(Serialize, Deserialize)]
struct SealedPayload {
    sub: String,
    access_token: String,
    iat: i64,
    exp: i64,
    jti: Uuid,
}

#[derive(Deserialize)]
struct JweHeader {
    alg: String,
    enc: String,
}

/// A sealed credential in its serialized (JWE compact) form.
///
/// Only [`Sealer::seal`] produces values of this type.  `Debug` does not
/// print the token since it is a bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedCredential(String);

impl SealedCredential {
    /// The serialized token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the credential and return the serialized token.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SealedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedCredential({} bytes)", self.0.len())
    }
}

// ---------------------------------------------------------------------------
// Sealer
// ---------------------------------------------------------------------------

/// Seals and unseals credentials with a single pre-shared key.
pub struct Sealer {
    cipher: Aes256Gcm,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl Sealer {
    /// Create a sealer that issues credentials valid for `ttl`, using the
    /// system clock.
    pub fn new(key: CredentialKey, ttl: TimeDelta) -> Self {
        Self::with_clock(key, ttl, Arc::new(SystemClock))
    }

    /// Create a sealer with an explicit time source.
    pub fn with_clock(key: CredentialKey, ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
            ttl,
            clock,
        }
    }

    /// Lifetime of credentials issued by this sealer.
    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Seal `claims` into an encrypted credential.
    ///
    /// `iat` is set to the current time, `exp` to `iat + ttl` and `jti` to a
    /// fresh UUID.
    ///
    /// # Errors
    ///
    /// [`SealError::InvalidClaims`] if the subject or the access token is
    /// empty, [`SealError::Encryption`] if the expiry is not representable
    /// or encoding or encryption fails.
    pub fn seal(&self, claims: &CredentialClaims) -> Result<SealedCredential, SealError> {
        if claims.subject.is_empty() {
            return Err(SealError::InvalidClaims("subject must not be empty"));
        }
        if claims.access_token.is_empty() {
            return Err(SealError::InvalidClaims("access token must not be empty"));
        }

        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| SealError::Encryption("expiry out of range".into()))?;
        let payload = SealedPayload {
            sub: claims.subject.clone(),
            access_token: claims.access_token.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };
        let plaintext =
            serde_json::to_vec(&payload).map_err(|e| SealError::Encryption(e.to_string()))?;

        let header = URL_SAFE_NO_PAD.encode(PROTECTED_HEADER);
        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        // aes-gcm appends the tag to the ciphertext
        let mut ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &plaintext,
                    aad: header.as_bytes(),
                },
            )
            .map_err(|e| SealError::Encryption(e.to_string()))?;
        let tag = ciphertext.split_off(ciphertext.len() - TAG_LEN);

        Ok(SealedCredential(format!(
            "{header}..{}.{}.{}",
            URL_SAFE_NO_PAD.encode(iv),
            URL_SAFE_NO_PAD.encode(&ciphertext),
            URL_SAFE_NO_PAD.encode(&tag),
        )))
    }

    /// Decrypt and validate a serialized credential.
    ///
    /// The ciphertext is authenticated before the header or the claims are
    /// interpreted.  Any modification that survives base64url decoding is
    /// therefore reported as [`UnsealError::IntegrityFailure`].  Edits to the
    /// serialized string that break the segment structure or the base64url
    /// encoding are caught earlier and reported as [`UnsealError::Malformed`].
    /// Either way no claims are returned.
    ///
    /// # Errors
    ///
    /// [`UnsealError::Malformed`], [`UnsealError::IntegrityFailure`] or
    /// [`UnsealError::Expired`].
    pub fn unseal(&self, token: &str) -> Result<UnsealedCredential, UnsealError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header, encrypted_key, iv, ciphertext, tag] = segments.as_slice() else {
            return Err(UnsealError::Malformed("expected 5 segments"));
        };
        if !encrypted_key.is_empty() {
            return Err(UnsealError::Malformed("unexpected encrypted key"));
        }

        let iv = decode_segment(iv)?;
        if iv.len() != IV_LEN {
            return Err(UnsealError::Malformed("invalid iv length"));
        }
        let tag = decode_segment(tag)?;
        if tag.len() != TAG_LEN {
            return Err(UnsealError::Malformed("invalid tag length"));
        }
        let mut sealed = decode_segment(ciphertext)?;
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &sealed,
                    aad: header.as_bytes(),
                },
            )
            .map_err(|_| UnsealError::IntegrityFailure)?;

        let header: JweHeader = serde_json::from_slice(&decode_segment(header)?)
            .map_err(|_| UnsealError::Malformed("invalid header"))?;
        if header.alg != ALG_DIR || header.enc != ENC_A256GCM {
            return Err(UnsealError::Malformed("unsupported algorithm"));
        }

        let payload: SealedPayload = serde_json::from_slice(&plaintext)
            .map_err(|_| UnsealError::Malformed("invalid claims"))?;

        if payload.exp <= self.clock.now().timestamp() {
            return Err(UnsealError::Expired);
        }

        Ok(UnsealedCredential {
            claims: CredentialClaims {
                subject: payload.sub,
                access_token: payload.access_token,
            },
            issued_at: timestamp(payload.iat)?,
            expires_at: timestamp(payload.exp)?,
            id: payload.jti,
        })
    }
}

impl fmt::Debug for Sealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sealer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

fn decode_segment(segment: &str) -> Result<Vec<u8>, UnsealError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| UnsealError::Malformed("invalid base64url segment"))
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, UnsealError> {
    DateTime::from_timestamp(secs, 0).ok_or(UnsealError::Malformed("timestamp out of range"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
