//! Provider webhook authentication.
//!
//! Every check fails closed: an unconfigured secret rejects all requests.

use shared::crypto::{constant_time_eq, verify_hmac_sha256_hex};
use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    NotConfigured,

    #[error("signature header missing")]
    MissingHeader,

    #[error("signature header malformed")]
    Malformed,

    #[error("timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("signature mismatch")]
    Mismatch,
}

impl From<SignatureError> for ApiError {
    fn from(err: SignatureError) -> Self {
        tracing::warn!(reason = %err, "Webhook authentication failed");
        ApiError::InvalidSignature
    }
}

/// Verifies a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`).
///
/// The signed payload is `"{t}.{body}"` keyed with [`stripe_signing_key`].
/// Any `v1` entry may match, which covers secret rotation.
pub fn verify_stripe_signature(
    secret: &str,
    payload: &[u8],
    header: Option<&str>,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NotConfigured);
    }
    let header = header.ok_or(SignatureError::MissingHeader)?;

    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }

    let within_tolerance = now
        .checked_sub(timestamp)
        .map(i64::unsigned_abs)
        .is_some_and(|skew| skew <= tolerance_secs.unsigned_abs());
    if !within_tolerance {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let mut signed_payload = format!("{}.", timestamp).into_bytes();
    signed_payload.extend_from_slice(payload);
    let key = stripe_signing_key(secret).as_bytes();

    if signatures
        .iter()
        .any(|candidate| verify_hmac_sha256_hex(key, &signed_payload, candidate))
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// HMAC key for a Stripe endpoint secret: the secret without its `whsec_`
/// prefix.
pub fn stripe_signing_key(secret: &str) -> &str {
    secret.strip_prefix("whsec_").unwrap_or(secret)
}

/// Verifies a hex HMAC-SHA256 of the raw body, as sent by Sumsub
/// (`X-Payload-Digest`) and GoCardless (`Webhook-Signature`).
pub fn verify_body_hmac(
    secret: &str,
    payload: &[u8],
    signature: Option<&str>,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::NotConfigured);
    }
    let signature = signature
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::MissingHeader)?;

    if verify_hmac_sha256_hex(secret.as_bytes(), payload, signature) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Checks HTTP Basic credentials configured on the Postmark webhook URL.
pub fn verify_basic_credentials(
    expected_username: &str,
    expected_password: &str,
    credentials: Option<(&str, &str)>,
) -> Result<(), SignatureError> {
    if expected_username.is_empty() || expected_password.is_empty() {
        return Err(SignatureError::NotConfigured);
    }
    let (username, password) = credentials.ok_or(SignatureError::MissingHeader)?;

    // Evaluate both so a wrong username costs the same as a wrong password.
    let user_ok = constant_time_eq(expected_username, username);
    let pass_ok = constant_time_eq(expected_password, password);
    if user_ok && pass_ok {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::crypto::hmac_sha256_hex;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"invoice.paid"}"#;
    const NOW: i64 = 1_700_000_000;

    fn stripe_header(secret: &str, timestamp: i64, body: &[u8]) -> String {
        let mut signed = format!("{}.", timestamp).into_bytes();
        signed.extend_from_slice(body);
        let key = stripe_signing_key(secret);
        format!("t={},v1={}", timestamp, hmac_sha256_hex(key.as_bytes(), &signed))
    }

    #[test]
    fn test_stripe_valid_signature() {
        let header = stripe_header(SECRET, NOW, BODY);
        assert_eq!(
            verify_stripe_signature(SECRET, BODY, Some(&header), 300, NOW + 10),
            Ok(())
        );
    }

    #[test]
    fn test_stripe_rotated_secret_second_v1_matches() {
        let good = stripe_header(SECRET, NOW, BODY);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "0".repeat(64), good_sig);
        assert!(verify_stripe_signature(SECRET, BODY, Some(&header), 300, NOW).is_ok());
    }

    #[test]
    fn test_stripe_tampered_body() {
        let header = stripe_header(SECRET, NOW, BODY);
        assert_eq!(
            verify_stripe_signature(SECRET, b"{}", Some(&header), 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stripe_wrong_secret() {
        let header = stripe_header("whsec_other", NOW, BODY);
        assert_eq!(
            verify_stripe_signature(SECRET, BODY, Some(&header), 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stripe_stale_timestamp() {
        let header = stripe_header(SECRET, NOW - 301, BODY);
        assert_eq!(
            verify_stripe_signature(SECRET, BODY, Some(&header), 300, NOW),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn test_stripe_extreme_timestamps_are_out_of_tolerance() {
        for timestamp in [i64::MIN, i64::MAX] {
            let header = format!("t={},v1={}", timestamp, "0".repeat(64));
            assert_eq!(
                verify_stripe_signature(SECRET, BODY, Some(&header), 300, NOW),
                Err(SignatureError::TimestampOutOfTolerance)
            );
        }
        assert_eq!(
            verify_stripe_signature(
                SECRET,
                b"{}",
                Some("t=-9223372036854775808,v1=00"),
                300,
                NOW
            ),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn test_stripe_malformed_and_missing() {
        assert_eq!(
            verify_stripe_signature(SECRET, BODY, None, 300, NOW),
            Err(SignatureError::MissingHeader)
        );
        assert_eq!(
            verify_stripe_signature(SECRET, BODY, Some("v1=abc"), 300, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_stripe_signature(SECRET, BODY, Some("t=123"), 300, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_stripe_signature(SECRET, BODY, Some("garbage"), 300, NOW),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn test_stripe_signing_key_strips_prefix() {
        assert_eq!(stripe_signing_key("whsec_abc"), "abc");
        assert_eq!(stripe_signing_key("abc"), "abc");
    }

    #[test]
    fn test_stripe_unconfigured_rejects() {
        let header = stripe_header("", NOW, BODY);
        assert_eq!(
            verify_stripe_signature("", BODY, Some(&header), 300, NOW),
            Err(SignatureError::NotConfigured)
        );
    }

    #[test]
    fn test_body_hmac() {
        let sig = hmac_sha256_hex(b"gc_secret", BODY);
        assert!(verify_body_hmac("gc_secret", BODY, Some(&sig)).is_ok());
        assert!(verify_body_hmac("gc_secret", BODY, Some(&sig.to_uppercase())).is_ok());
        assert_eq!(
            verify_body_hmac("gc_secret", b"other", Some(&sig)),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_body_hmac("gc_secret", BODY, Some("  ")),
            Err(SignatureError::MissingHeader)
        );
        assert_eq!(
            verify_body_hmac("", BODY, Some(&sig)),
            Err(SignatureError::NotConfigured)
        );
    }

    #[test]
    fn test_basic_credentials() {
        assert!(verify_basic_credentials("pm", "pw", Some(("pm", "pw"))).is_ok());
        assert_eq!(
            verify_basic_credentials("pm", "pw", Some(("pm", "nope"))),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_basic_credentials("pm", "pw", None),
            Err(SignatureError::MissingHeader)
        );
        assert_eq!(
            verify_basic_credentials("", "", Some(("", ""))),
            Err(SignatureError::NotConfigured)
        );
    }

    #[test]
    fn test_maps_to_invalid_signature() {
        assert!(matches!(
            ApiError::from(SignatureError::Mismatch),
            ApiError::InvalidSignature
        ));
    }
}
