//! Client-side request signing.
//!
//! The signer produces the `Date`, `Nonce` and `Authorization` headers the
//! verifier expects, building the canonical string with the same routine the
//! verifier uses.

use std::sync::Arc;

use http::HeaderValue;
use tracing::debug;
use uuid::Uuid;

use crate::canonical::{build_canonical_string, format_http_date, parse_http_date};
use crate::clock::{Clock, SystemClock};
use crate::error::{HmacAuthError, HmacAuthResult};
use crate::header::{AuthorizationHeaderValue, DATE_HEADER, NONCE_HEADER};
use crate::options::DEFAULT_SCHEME;
use crate::signature::compute_signature;

/// The parts of an outgoing request covered by the signature.
#[derive(Debug, Clone, Copy)]
pub struct OutgoingRequest<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// URI path.
    pub path: &'a str,
    /// Query string, with or without the leading `?`.
    pub query: Option<&'a str>,
    /// Request body. Decoded as UTF-8 with replacement, as the verifier does.
    pub body: &'a [u8],
}

/// Header values produced by [`RequestSigner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `Date` header value (RFC 1123).
    pub date: String,
    /// `Nonce` header value.
    pub nonce: String,
    /// `Authorization` header value: `HMAC <id>:<signature>`.
    pub authorization: String,
    /// The canonical string that was signed.
    pub canonical: String,
}

impl SignedHeaders {
    /// Insert the three headers into `headers`, replacing existing values.
    ///
    /// # Errors
    ///
    /// Returns [`HmacAuthError::InvalidArgument`] if a value is not a valid
    /// header value.
    pub fn apply(&self, headers: &mut http::HeaderMap) -> HmacAuthResult<()> {
        headers.insert(DATE_HEADER, to_header_value(&self.date)?);
        headers.insert(NONCE_HEADER, to_header_value(&self.nonce)?);
        headers.insert(
            http::header::AUTHORIZATION,
            to_header_value(&self.authorization)?,
        );
        Ok(())
    }
}

/// Signs outgoing requests for one identity at a time.
///
/// # Examples
///
/// ```
/// use hmac_auth::signer::RequestSigner;
///
/// let mut request = http::Request::builder()
///     .method("GET")
///     .uri("https://api.example.com/orders?page=2")
///     .body(())
///     .unwrap();
///
/// RequestSigner::new()
///     .attach_signature(&mut request, "acct-1", "s3cr3t", b"")
///     .unwrap();
///
/// let auth = request.headers()["authorization"].to_str().unwrap();
/// assert!(auth.starts_with("HMAC acct-1:"));
/// assert!(request.headers().contains_key("date"));
/// assert!(request.headers().contains_key("nonce"));
/// ```
pub struct RequestSigner {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}

impl Default for RequestSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestSigner {
    /// Create a signer driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a signer driven by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Sign `request` with a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`HmacAuthError::InvalidArgument`] if the secret is empty or
    /// the identity id cannot be carried in the `Authorization` header.
    pub fn sign(
        &self,
        request: &OutgoingRequest<'_>,
        identity_id: &str,
        secret: &str,
    ) -> HmacAuthResult<SignedHeaders> {
        let nonce = Uuid::new_v4().to_string();
        self.sign_with_nonce(request, identity_id, secret, &nonce)
    }

    /// Sign `request` with a caller-chosen nonce.
    ///
    /// The nonce must be unpredictable and never reused; prefer [`Self::sign`].
    ///
    /// # Errors
    ///
    /// See [`Self::sign`].
    pub fn sign_with_nonce(
        &self,
        request: &OutgoingRequest<'_>,
        identity_id: &str,
        secret: &str,
        nonce: &str,
    ) -> HmacAuthResult<SignedHeaders> {
        if identity_id.is_empty() || identity_id.contains([' ', ':']) {
            return Err(HmacAuthError::invalid_argument(format!(
                "identity id {identity_id:?} must be non-empty and free of spaces and colons"
            )));
        }

        // Sign the date exactly as it will appear on the wire.
        let date = format_http_date(self.clock.now());
        let signed_date = parse_http_date(&date).ok_or_else(|| {
            HmacAuthError::invalid_argument(format!("clock produced unparsable date {date:?}"))
        })?;

        let body = String::from_utf8_lossy(request.body);
        let canonical = build_canonical_string(
            signed_date,
            &body,
            request.method,
            request.path,
            request.query,
            nonce,
        )?;
        let signature = compute_signature(secret.as_bytes(), &canonical)?;

        debug!(identity_id, canonical = ?canonical, "Signed outgoing request");

        let authorization = AuthorizationHeaderValue {
            identity_id: identity_id.to_owned(),
            signature,
        }
        .to_header_value(DEFAULT_SCHEME);

        Ok(SignedHeaders {
            date,
            nonce: nonce.to_owned(),
            authorization,
            canonical,
        })
    }

    /// Sign an `http::Request` and attach the `Date`, `Nonce` and
    /// `Authorization` headers to it.
    ///
    /// `body` must be the exact bytes that will be sent.
    ///
    /// # Errors
    ///
    /// See [`Self::sign`] and [`SignedHeaders::apply`].
    pub fn attach_signature<B>(
        &self,
        request: &mut http::Request<B>,
        identity_id: &str,
        secret: &str,
        body: &[u8],
    ) -> HmacAuthResult<SignedHeaders> {
        let outgoing = OutgoingRequest {
            method: request.method().as_str(),
            path: request.uri().path(),
            query: request.uri().query(),
            body,
        };
        let signed = self.sign(&outgoing, identity_id, secret)?;
        signed.apply(request.headers_mut())?;
        Ok(signed)
    }
}

fn to_header_value(value: &str) -> HmacAuthResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| HmacAuthError::invalid_argument(format!("invalid header value: {e}")))
}
