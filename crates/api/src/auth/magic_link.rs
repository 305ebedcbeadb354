//! Magic-link sign-in tokens.
//!
//! A token is an HS256 JWT whose subject is the email address. The `jti` is
//! also stored in `magic_link_tokens` so a token can be consumed once; the
//! signature alone only proves we issued it.

use atelier_core::types::Timestamp;
use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in every magic-link token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MagicLinkClaims {
    /// Normalized email address the link was requested for.
    pub sub: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl MagicLinkClaims {
    pub fn expires_at(&self) -> Timestamp {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// Issue a token for `email`, valid for `ttl_mins`.
pub fn issue_token(
    email: &str,
    secret: &str,
    ttl_mins: i64,
) -> Result<(String, MagicLinkClaims), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = MagicLinkClaims {
        sub: email.to_string(),
        jti: Uuid::new_v4().to_string(),
        exp: (now + Duration::minutes(ttl_mins)).timestamp(),
        iat: now.timestamp(),
    };
    let token = encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, claims))
}

/// Check signature and expiry. Single use is enforced by the caller.
pub fn validate_token(
    token: &str,
    secret: &str,
) -> Result<MagicLinkClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    let data = decode::<MagicLinkClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// `{app_url}/auth/verify?token=..[&callback_url=..]`.
///
/// Only same-site paths are forwarded as a callback.
pub fn verify_url(app_url: &str, token: &str, callback_url: Option<&str>) -> String {
    let base = format!("{app_url}/auth/verify");
    let mut params = vec![("token", token)];
    if let Some(callback) = callback_url.filter(|c| is_local_path(c)) {
        params.push(("callback_url", callback));
    }
    match reqwest::Url::parse_with_params(&base, &params) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{base}?token={token}"),
    }
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}
