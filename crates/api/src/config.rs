//! Server configuration loaded from environment variables.
//!
//! Each group has a `from_lookup` constructor taking a variable source so it
//! can be validated without touching the process environment (tests and
//! `atelier-admin check-config` use this).

use std::str::FromStr;

use atelier_core::upload::DEFAULT_MAX_UPLOAD_BYTES;

use crate::stripe::StripeConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Read one variable, treating blank values as unset.
pub(crate) fn var(get: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset.
pub(crate) fn parse_or<T>(
    get: &dyn Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(get, name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins (admin dashboard and docs site).
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub auth: AuthConfig,
    pub upload: UploadConfig,
    pub stripe: StripeConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default                                       |
    /// |------------------------|-----------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                     |
    /// | `PORT`                 | `3333`                                        |
    /// | `CORS_ORIGINS`         | `http://localhost:3000,http://localhost:3001` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                          |
    ///
    /// See [`AuthConfig`], [`UploadConfig`] and [`StripeConfig`] for the rest.
    ///
    /// # Panics
    ///
    /// Panics on a missing required variable or a malformed value, so
    /// misconfiguration fails at startup.
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_else(|e| panic!("Invalid configuration: {e}"))
    }

    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let cors_origins = var(get, "CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://localhost:3001".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: var(get, "HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(get, "PORT", 3333)?,
            cors_origins,
            request_timeout_secs: parse_or(get, "REQUEST_TIMEOUT_SECS", 30)?,
            auth: AuthConfig::from_lookup(get)?,
            upload: UploadConfig::from_lookup(get)?,
            stripe: StripeConfig::from_lookup(get)?,
        })
    }
}

// ---------------------------------------------------------------------------
// AuthConfig
// ---------------------------------------------------------------------------

/// Minimum length of `AUTH_SECRET`; HS256 keys shorter than this are weak.
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret that signs magic-link tokens.
    pub secret: String,
    pub session_ttl_days: i64,
    pub magic_link_ttl_mins: i64,
    /// Base URL of the site that hosts `/auth/verify`.
    pub app_url: String,
    /// Whether the session cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
}

impl AuthConfig {
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `AUTH_SECRET`           | **required**            |
    /// | `SESSION_TTL_DAYS`      | `30`                    |
    /// | `MAGIC_LINK_TTL_MINS`   | `15`                    |
    /// | `APP_URL`               | `http://localhost:3001` |
    /// | `SESSION_COOKIE_SECURE` | `false`                 |
    pub fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = var(get, "AUTH_SECRET").ok_or(ConfigError::Missing("AUTH_SECRET"))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "AUTH_SECRET",
                reason: format!("must be at least {MIN_SECRET_LEN} characters"),
            });
        }

        let session_ttl_days: i64 = parse_or(get, "SESSION_TTL_DAYS", 30)?;
        let magic_link_ttl_mins: i64 = parse_or(get, "MAGIC_LINK_TTL_MINS", 15)?;
        if session_ttl_days <= 0 || magic_link_ttl_mins <= 0 {
            return Err(ConfigError::Invalid {
                var: "SESSION_TTL_DAYS / MAGIC_LINK_TTL_MINS",
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            secret,
            session_ttl_days,
            magic_link_ttl_mins,
            app_url: var(get, "APP_URL")
                .unwrap_or_else(|| "http://localhost:3001".into())
                .trim_end_matches('/')
                .to_string(),
            cookie_secure: parse_or(get, "SESSION_COOKIE_SECURE", false)?,
        })
    }
}

// ---------------------------------------------------------------------------
// UploadConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Largest accepted single file.
    pub max_upload_bytes: usize,
    /// Largest accepted multipart request body.
    pub max_batch_bytes: usize,
    /// Files uploaded to the disk at the same time.
    pub concurrency: usize,
    /// Retries per file after the first failed attempt.
    pub max_retries: u32,
    /// Backoff before retry `n` is `retry_base_delay_ms * 2^n`.
    pub retry_base_delay_ms: u64,
}

impl UploadConfig {
    /// | Env Var              | Default             |
    /// |----------------------|---------------------|
    /// | `MAX_UPLOAD_BYTES`   | `26214400` (25 MiB) |
    /// | `MAX_BATCH_BYTES`    | `104857600`         |
    /// | `UPLOAD_CONCURRENCY` | `4`                 |
    /// | `UPLOAD_MAX_RETRIES` | `2`                 |
    pub fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_upload_bytes = parse_or(get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let max_batch_bytes = parse_or(get, "MAX_BATCH_BYTES", 4 * DEFAULT_MAX_UPLOAD_BYTES)?;
        let concurrency: usize = parse_or(get, "UPLOAD_CONCURRENCY", 4)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                var: "UPLOAD_CONCURRENCY",
                reason: "must be at least 1".into(),
            });
        }
        if max_batch_bytes < max_upload_bytes {
            return Err(ConfigError::Invalid {
                var: "MAX_BATCH_BYTES",
                reason: "must not be smaller than MAX_UPLOAD_BYTES".into(),
            });
        }
        Ok(Self {
            max_upload_bytes,
            max_batch_bytes,
            concurrency,
            max_retries: parse_or(get, "UPLOAD_MAX_RETRIES", 2)?,
            retry_base_delay_ms: 100,
        })
    }
}
