//! Auth service configuration.
//!
//! Everything is read from environment variables once at startup.  A
//! missing or invalid required value is fatal: the binary refuses to start
//! rather than serve requests it cannot complete.

use std::fmt;
use std::time::Duration;

use chrono::TimeDelta;
use superqi_credential::{CredentialKey, KeyError};

/// Upper bound for `CREDENTIAL_TTL_SECS`.
const MAX_CREDENTIAL_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Errors produced while reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: {reason}")]
    Invalid {
        /// The offending variable.
        var: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// `CREDENTIAL_KEY` is not a valid key.
    #[error("invalid CREDENTIAL_KEY: {0}")]
    CredentialKey(#[from] KeyError),
}

/// Connection and signing parameters for the identity provider.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Base URL of the provider's open API (e.g. `https://open.example.com/api`).
    pub base_url: String,
    /// Client id registered with the provider.
    pub client_id: String,
    /// RSA private key (PEM or bare base64 DER) used to sign requests.
    pub private_key: String,
    /// Version of `private_key` as registered with the provider.
    pub key_version: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("private_key", &"<redacted>")
            .field("key_version", &self.key_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Global configuration, constructed once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to listen on (default `1999`).
    pub listen_port: u16,
    /// Key used to seal session credentials.
    pub credential_key: CredentialKey,
    /// Lifetime of issued credentials (default 24 hours).
    pub credential_ttl: TimeDelta,
    /// Identity provider parameters.
    pub provider: ProviderConfig,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                | Default  | Description                               |
    /// |-------------------------|----------|-------------------------------------------|
    /// | `PORT`                  | `1999`   | HTTP listen port                          |
    /// | `CREDENTIAL_KEY`        | required | base64 of the 32-byte sealing key         |
    /// | `CREDENTIAL_TTL_SECS`   | `86400`  | Lifetime of issued credentials, max 1 year |
    /// | `PROVIDER_BASE_URL`     | required | Provider open API base URL                |
    /// | `PROVIDER_CLIENT_ID`    | required | Client id registered with the provider    |
    /// | `PROVIDER_PRIVATE_KEY`  | required | RSA private key (PEM or base64 DER)       |
    /// | `PROVIDER_KEY_VERSION`  | `1`      | Key version sent in the `Signature` header |
    /// | `PROVIDER_TIMEOUT_SECS` | `10`     | Timeout for each provider call            |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let listen_port = parse_or(&lookup, "PORT", 1999)?;
        let credential_key = CredentialKey::from_base64(&required("CREDENTIAL_KEY")?)?;

        let ttl_secs: i64 = parse_or(&lookup, "CREDENTIAL_TTL_SECS", 86_400)?;
        if ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "CREDENTIAL_TTL_SECS",
                reason: "must be positive".into(),
            });
        }
        if ttl_secs > MAX_CREDENTIAL_TTL_SECS {
            return Err(ConfigError::Invalid {
                var: "CREDENTIAL_TTL_SECS",
                reason: format!("must not exceed {MAX_CREDENTIAL_TTL_SECS} (one year)"),
            });
        }
        let credential_ttl = TimeDelta::try_seconds(ttl_secs).ok_or(ConfigError::Invalid {
            var: "CREDENTIAL_TTL_SECS",
            reason: "out of range".into(),
        })?;

        let provider = ProviderConfig {
            base_url: required("PROVIDER_BASE_URL")?,
            client_id: required("PROVIDER_CLIENT_ID")?,
            private_key: required("PROVIDER_PRIVATE_KEY")?,
            key_version: parse_or(&lookup, "PROVIDER_KEY_VERSION", 1)?,
            timeout: Duration::from_secs(parse_or(&lookup, "PROVIDER_TIMEOUT_SECS", 10)?),
        };

        Ok(Self {
            listen_port,
            credential_key,
            credential_ttl,
            provider,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}
