//! Verification of the `Stripe-Signature` webhook header.
//!
//! The header looks like `t=1492774577,v1=5257a869...,v0=...`. The signed
//! payload is `"{t}.{raw_body}"`, signed with HMAC-SHA256 using the endpoint
//! secret. Several `v1` entries may be present while a secret is rotated; any
//! one matching is enough.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::hashing::{hex_decode, hex_encode};

type HmacSha256 = Hmac<Sha256>;

/// Default tolerance between the signed timestamp and now (seconds).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Stripe-Signature header is malformed")]
    MalformedHeader,

    #[error("Stripe-Signature header has no v1 signature")]
    NoSignatures,

    #[error("Webhook timestamp is outside the tolerance window")]
    TimestampOutOfTolerance,

    #[error("No signature matches the payload")]
    Mismatch,
}

/// Parsed form of the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

/// Parse a `Stripe-Signature` header value.
pub fn parse_header(header: &str) -> Result<SignatureHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(SignatureError::MalformedHeader)?;
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::MalformedHeader)?,
                );
            }
            "v1" => signatures.push(value.to_string()),
            _ => {} // v0 and future schemes are ignored
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::NoSignatures);
    }
    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Compute the hex `v1` signature for a payload at a given timestamp.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex_encode(mac.finalize().into_bytes())
}

/// Verify a webhook payload against its `Stripe-Signature` header.
///
/// `now` is the current Unix time in seconds. Comparison against each
/// candidate signature is constant-time.
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let parsed = parse_header(header)?;

    if now.abs_diff(parsed.timestamp) > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(parsed.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = parsed.signatures.iter().any(|candidate| {
        hex_decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Build a header value for `payload`, as Stripe would. Used by tests and
/// local tooling that replays events.
pub fn sign_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!(
        "t={timestamp},v1={}",
        compute_signature(secret, timestamp, payload)
    )
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn valid_signature_verifies() {
        let body = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let header = sign_header(SECRET, NOW, body);
        assert!(verify(body, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW + 10).is_ok());
    }

    #[test]
    fn tampered_body_fails() {
        let header = sign_header(SECRET, NOW, b"original");
        assert_matches!(
            verify(b"tampered", &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn wrong_secret_fails() {
        let header = sign_header("whsec_other", NOW, b"body");
        assert_matches!(
            verify(b"body", &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_fails() {
        let header = sign_header(SECRET, NOW, b"body");
        assert_matches!(
            verify(b"body", &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW + 301),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn extreme_timestamps_are_out_of_tolerance() {
        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={t},v1=00");
            assert_matches!(
                verify(b"body", &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
                Err(SignatureError::TimestampOutOfTolerance)
            );
        }
    }

    #[test]
    fn any_matching_v1_is_accepted() {
        let good = compute_signature(SECRET, NOW, b"body");
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={good}");
        assert!(verify(b"body", &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).is_ok());
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert_matches!(parse_header("garbage"), Err(SignatureError::MalformedHeader));
        assert_matches!(parse_header("v1=abc"), Err(SignatureError::MalformedHeader));
        assert_matches!(parse_header("t=abc,v1=00"), Err(SignatureError::MalformedHeader));
        assert_matches!(parse_header("t=123"), Err(SignatureError::NoSignatures));
    }

    #[test]
    fn non_hex_signature_does_not_match() {
        let header = format!("t={NOW},v1=not-hex");
        assert_matches!(
            verify(b"body", &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW),
            Err(SignatureError::Mismatch)
        );
    }
}
