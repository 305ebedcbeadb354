//! Opaque session tokens and the session cookie.
//!
//! The plaintext token goes to the client once; only its SHA-256 digest is
//! stored in `sessions`.

use atelier_core::hashing::{random_token, sha256_hex};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "atelier_session";

/// 43 alphanumeric characters carry a little over 256 bits.
const SESSION_TOKEN_LEN: usize = 43;

/// Returns `(plaintext, sha256_hex)`.
pub fn generate_session_token() -> (String, String) {
    let plaintext = random_token(SESSION_TOKEN_LEN);
    let hash = hash_session_token(&plaintext);
    (plaintext, hash)
}

pub fn hash_session_token(token: &str) -> String {
    sha256_hex(token.as_bytes())
}

/// `Set-Cookie` value that stores `token` for `max_age_secs`.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Session token from `Authorization: Bearer` or, failing that, the cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
