//! The shared symmetric key.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Length of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Errors produced when parsing a [`CredentialKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// The value was not valid standard base64.
    #[error("credential key is not valid base64")]
    Encoding,

    /// The decoded key had the wrong length.
    #[error("credential key must be 32 bytes, got {0}")]
    Length(usize),
}

/// 256-bit key shared by everyone who seals or unseals credentials.
///
/// `Debug` never prints the key material.
#[derive(Clone)]
pub struct CredentialKey([u8; KEY_LEN]);

impl CredentialKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a key from standard (padded) base64.
    ///
    /// # Errors
    ///
    /// [`KeyError::Encoding`] if the input is not base64, [`KeyError::Length`]
    /// if it does not decode to exactly 32 bytes.
    ///
    /// ```
    /// use superqi_credential::CredentialKey;
    ///
    /// assert!(CredentialKey::from_base64("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=").is_ok());
    /// assert!(CredentialKey::from_base64("c2hvcnQ=").is_err());
    /// ```
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| KeyError::Encoding)?;
        let len = bytes.len();
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| KeyError::Length(len))?;
        Ok(Self(key))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialKey(<redacted>)")
    }
}
