//! Keyed-hash signature computation.
//!
//! `Signature = Base64(HMAC-SHA256(secret, UTF-8(canonical_string)))`

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{HmacAuthError, HmacAuthResult};

type HmacSha256 = Hmac<Sha256>;

/// Compute the base64-encoded HMAC-SHA256 of `message` keyed with `secret`.
///
/// # Errors
///
/// Returns [`HmacAuthError::InvalidArgument`] if `secret` is empty.
///
/// # Examples
///
/// ```
/// use hmac_auth::signature::compute_signature;
///
/// let sig = compute_signature(b"s3cr3t", "hello").unwrap();
/// assert_eq!(sig.len(), 44);
/// ```
pub fn compute_signature(secret: &[u8], message: &str) -> HmacAuthResult<String> {
    if secret.is_empty() {
        return Err(HmacAuthError::invalid_argument("secret must not be empty"));
    }

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| HmacAuthError::invalid_argument(format!("unusable HMAC key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Compare two signatures in constant time.
#[must_use]
pub fn signatures_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_match_rfc4231_test_case_2() {
        // Key "Jefe", data "what do ya want for nothing?".
        let sig = compute_signature(b"Jefe", "what do ya want for nothing?").unwrap();
        let raw = BASE64.decode(sig).unwrap();
        let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(
            hex,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_should_be_deterministic() {
        let first = compute_signature(b"secret", "data").unwrap();
        let second = compute_signature(b"secret", "data").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_should_depend_on_key_and_message() {
        let base = compute_signature(b"secret", "data").unwrap();
        assert_ne!(base, compute_signature(b"secreT", "data").unwrap());
        assert_ne!(base, compute_signature(b"secret", "datA").unwrap());
    }

    #[test]
    fn test_should_reject_empty_secret() {
        let result = compute_signature(b"", "data");
        assert!(matches!(result, Err(HmacAuthError::InvalidArgument(_))));
    }

    #[test]
    fn test_should_sign_empty_message() {
        assert!(compute_signature(b"secret", "").is_ok());
    }

    #[test]
    fn test_should_compare_signatures() {
        assert!(signatures_match("abc=", "abc="));
        assert!(!signatures_match("abc=", "abd="));
        assert!(!signatures_match("abc", "abc="));
    }
}
