//! HTTP header names and `Authorization` header parsing.

/// Header carrying the request timestamp (RFC 1123).
pub const DATE_HEADER: &str = "date";

/// Header carrying the single-use nonce.
pub const NONCE_HEADER: &str = "nonce";

/// Parsed `Authorization: <scheme> <id>:<signature>` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHeaderValue {
    /// The identity that claims to have signed the request.
    pub identity_id: String,
    /// The base64-encoded signature.
    pub signature: String,
}

impl AuthorizationHeaderValue {
    /// Parse an `Authorization` header value for `scheme`.
    ///
    /// The value must split into exactly three non-empty tokens on spaces and
    /// colons, and the first must equal `scheme` (ASCII case-insensitive).
    /// Anything else yields `None`; the result is never partially populated.
    ///
    /// # Examples
    ///
    /// ```
    /// use hmac_auth::header::AuthorizationHeaderValue;
    ///
    /// let parsed = AuthorizationHeaderValue::parse("HMAC acct-1:c2lnbmF0dXJl", "HMAC").unwrap();
    /// assert_eq!(parsed.identity_id, "acct-1");
    /// assert_eq!(parsed.signature, "c2lnbmF0dXJl");
    ///
    /// assert!(AuthorizationHeaderValue::parse("Bearer token", "HMAC").is_none());
    /// ```
    #[must_use]
    pub fn parse(value: &str, scheme: &str) -> Option<Self> {
        let tokens: Vec<&str> = value.split([' ', ':']).collect();
        let [name, id, signature] = tokens.as_slice() else {
            return None;
        };

        if !name.eq_ignore_ascii_case(scheme) || id.is_empty() || signature.is_empty() {
            return None;
        }

        Some(Self {
            identity_id: (*id).to_owned(),
            signature: (*signature).to_owned(),
        })
    }

    /// Render the header value for `scheme`.
    #[must_use]
    pub fn to_header_value(&self, scheme: &str) -> String {
        format!("{scheme} {}:{}", self.identity_id, self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_well_formed_header() {
        let parsed = AuthorizationHeaderValue::parse("HMAC mykey:abc+/=", "HMAC").unwrap();
        assert_eq!(parsed.identity_id, "mykey");
        assert_eq!(parsed.signature, "abc+/=");
    }

    #[test]
    fn test_should_accept_scheme_in_any_case() {
        assert!(AuthorizationHeaderValue::parse("hmac id:sig", "HMAC").is_some());
    }

    #[test]
    fn test_should_reject_malformed_headers() {
        for value in [
            "",
            "HMAC",
            "HMAC id",
            "HMAC id:",
            "HMAC :sig",
            "HMAC  id:sig",
            "HMAC id:sig:extra",
            "HMAC id:sig extra",
            "HMACid:sig",
            "Basic id:sig",
        ] {
            assert!(
                AuthorizationHeaderValue::parse(value, "HMAC").is_none(),
                "should reject {value:?}"
            );
        }
    }

    #[test]
    fn test_should_render_header_value() {
        let value = AuthorizationHeaderValue {
            identity_id: "acct-1".to_owned(),
            signature: "sig=".to_owned(),
        };
        let rendered = value.to_header_value("HMAC");
        assert_eq!(rendered, "HMAC acct-1:sig=");
        assert_eq!(AuthorizationHeaderValue::parse(&rendered, "HMAC"), Some(value));
    }
}
