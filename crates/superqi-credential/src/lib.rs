#![deny(missing_docs)]

//! # SuperQi Credential
//!
//! Sealed session credentials issued by the SuperQi auth service.
//!
//! A credential carries the provider access token and the subject it was
//! issued for, encrypted with a pre-shared 256-bit key.  Holders of the key
//! (the auth service itself and any backend that calls the provider on the
//! user's behalf) can recover the claims; everybody else sees an opaque
//! string.
//!
//! ```text
//! BASE64URL(header) . "" . BASE64URL(iv) . BASE64URL(ciphertext) . BASE64URL(tag)
//! ```
//!
//! The container is a JWE compact serialization using direct key agreement
//! (`alg: dir`) and AES-256-GCM (`enc: A256GCM`).
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`claims`] | Claim sets going in and coming out of the sealer |
//! | [`clock`] | Time source used for `iat` / `exp` |
//! | [`error`] | [`SealError`] and [`UnsealError`] |
//! | [`key`] | The shared symmetric [`CredentialKey`] |
//! | [`sealer`] | [`Sealer`]: `seal` / `unseal` |
//!
//! # Example
//!
//! ```
//! use chrono::TimeDelta;
//! use superqi_credential::{CredentialClaims, CredentialKey, Sealer};
//!
//! let key = CredentialKey::from_bytes([7u8; 32]);
//! let sealer = Sealer::new(key, TimeDelta::hours(1));
//!
//! let claims = CredentialClaims::new("U42", "AT1");
//! let sealed = sealer.seal(&claims).unwrap();
//!
//! let opened = sealer.unseal(sealed.as_str()).unwrap();
//! assert_eq!(opened.claims, claims);
//! ```

pub mod claims;
pub mod clock;
pub mod error;
pub mod key;
pub mod sealer;

pub use claims::{CredentialClaims, UnsealedCredential};
pub use clock::{Clock, SystemClock};
pub use error::{SealError, UnsealError};
pub use key::{CredentialKey, KeyError};
pub use sealer::{SealedCredential, Sealer};
