//! Hashing, HMAC and token helpers.
//!
//! Session tokens are never stored raw: the cookie carries the token and the
//! database carries its SHA-256 hex digest.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a session or CSRF token.
pub const TOKEN_BYTES: usize = 32;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Computes HMAC-SHA256 of `payload` keyed with `secret`, hex encoded.
pub fn hmac_sha256_hex(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Compares two strings in time independent of where they first differ.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    // Unequal lengths short-circuit inside `ct_eq`; only the length leaks.
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

/// Verifies a hex HMAC-SHA256 signature. Hex case is ignored; anything that
/// is not valid hex is a mismatch.
pub fn verify_hmac_sha256_hex(secret: &[u8], payload: &[u8], signature: &str) -> bool {
    let Ok(signature) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}

/// Generates a URL-safe random token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
