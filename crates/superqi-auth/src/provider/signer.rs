//! Provider request signing.
//!
//! Each request to the provider carries three headers:
//!
//! | Header         | Value                                                       |
//! |----------------|-------------------------------------------------------------|
//! | `Client-Id`    | The service's client id                                     |
//! | `Request-Time` | RFC 3339 timestamp of the request                           |
//! | `Signature`    | `algorithm=RSA256, keyVersion=<n>, signature=<urlencoded>`  |
//!
//! The signature covers `"<METHOD> <PATH>\n<client-id>.<request-time>.<body>"`,
//! so it is bound to both the payload and the time and has to be computed
//! for every request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;

/// Errors produced while loading a key or signing.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The private key could not be parsed as PKCS#8 or PKCS#1.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// The signing operation itself failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Computes the signature attached to provider requests.
///
/// Implementations must be deterministic for identical content.
pub trait RequestSigner: Send + Sync {
    /// Version of the key registered with the provider.
    fn key_version(&self) -> u32;

    /// Sign `content`, returning the standard base64 signature.
    fn sign(&self, content: &[u8]) -> Result<String, SignError>;
}

/// The string the provider expects to be signed.
pub fn signing_content(
    method: &str,
    path: &str,
    client_id: &str,
    request_time: &str,
    body: &str,
) -> String {
    format!("{method} {path}\n{client_id}.{request_time}.{body}")
}

/// Value of the `Signature` header.
pub fn signature_header(key_version: u32, signature: &str) -> String {
    format!(
        "algorithm=RSA256, keyVersion={key_version}, signature={}",
        urlencoding::encode(signature)
    )
}

/// RSASSA-PKCS1-v1_5 with SHA-256, the scheme the provider calls `RSA256`.
pub struct RsaSha256Signer {
    key: SigningKey<Sha256>,
    key_version: u32,
}

impl RsaSha256Signer {
    /// Build a signer from a parsed private key.
    pub fn new(private_key: RsaPrivateKey, key_version: u32) -> Self {
        Self {
            key: SigningKey::<Sha256>::new(private_key),
            key_version,
        }
    }

    /// Parse a private key as exported from the provider console.
    ///
    /// Accepts PEM (PKCS#8 or PKCS#1) or bare base64 DER, which is what
    /// the console hands out.
    pub fn from_encoded(encoded: &str, key_version: u32) -> Result<Self, SignError> {
        let encoded = encoded.trim();
        let key = if encoded.starts_with("-----BEGIN") {
            RsaPrivateKey::from_pkcs8_pem(encoded)
                .or_else(|_| RsaPrivateKey::from_pkcs1_pem(encoded))
                .map_err(|e| SignError::InvalidKey(e.to_string()))?
        } else {
            let compact: String = encoded.split_whitespace().collect();
            let der = STANDARD
                .decode(compact)
                .map_err(|e| SignError::InvalidKey(e.to_string()))?;
            RsaPrivateKey::from_pkcs8_der(&der)
                .or_else(|_| RsaPrivateKey::from_pkcs1_der(&der))
                .map_err(|e| SignError::InvalidKey(e.to_string()))?
        };
        Ok(Self::new(key, key_version))
    }
}

impl RequestSigner for RsaSha256Signer {
    fn key_version(&self) -> u32 {
        self.key_version
    }

    fn sign(&self, content: &[u8]) -> Result<String, SignError> {
        let signature = self
            .key
            .try_sign(content)
            .map_err(|e| SignError::Signing(e.to_string()))?;
        Ok(STANDARD.encode(signature.to_bytes()))
    }
}
