//! HMAC request verification.
//!
//! [`HmacAuthenticator::authenticate`] runs these steps in order, stopping at
//! the first terminal outcome:
//!
//! 1. Parse `Authorization: HMAC <id>:<signature>`. Missing or malformed
//!    yields [`AuthenticateResult::NoResult`] so other schemes may try.
//! 2. Parse the `Date` header and require `now - drift <= date <= now + drift`.
//! 3. If a `Nonce` header is present, record it in the replay cache for twice
//!    the drift; a live duplicate fails. The nonce is consumed even if a
//!    later step fails.
//! 4. Resolve the identity's secret.
//! 5. Rebuild the canonical string from the buffered body and request line,
//!    sign it and compare with the provided signature in constant time.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::canonical::{build_canonical_string, parse_http_date};
use crate::clock::{Clock, SystemClock};
use crate::error::{AuthFailure, HmacAuthResult};
use crate::header::{AuthorizationHeaderValue, DATE_HEADER, NONCE_HEADER};
use crate::options::AuthenticationOptions;
use crate::replay::NonceCache;
use crate::secrets::SecretLookup;
use crate::signature::{compute_signature, signatures_match};

/// The principal issued for a successfully verified request.
///
/// It lives for the single request: it is never persisted and never refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    /// The verified identity id.
    pub id: String,
    /// Roles attached by the configured role resolver, if any.
    pub roles: Option<Vec<String>>,
    /// The scheme that issued this identity.
    pub scheme: String,
    /// Always `false`.
    pub is_persistent: bool,
    /// Always `false`.
    pub allow_refresh: bool,
}

impl AuthenticatedIdentity {
    fn issue(id: String, roles: Option<Vec<String>>, scheme: &str) -> Self {
        Self {
            id,
            roles,
            scheme: scheme.to_owned(),
            is_persistent: false,
            allow_refresh: false,
        }
    }

    /// Whether the identity carries `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .as_ref()
            .is_some_and(|roles| roles.iter().any(|r| r == role))
    }
}

/// Terminal outcome of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticateResult {
    /// The scheme does not apply to this request.
    NoResult,
    /// The scheme applies and the request is not authenticated.
    Fail(AuthFailure),
    /// The request is authenticated.
    Success(AuthenticatedIdentity),
}

impl AuthenticateResult {
    /// Whether this is [`AuthenticateResult::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The issued identity, on success.
    #[must_use]
    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        match self {
            Self::Success(identity) => Some(identity),
            _ => None,
        }
    }

    /// The failure reason, on failure.
    #[must_use]
    pub fn failure(&self) -> Option<AuthFailure> {
        match self {
            Self::Fail(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Verifies HMAC-signed requests.
///
/// Stateless per request apart from the shared nonce cache, so one instance
/// can serve any number of concurrent requests.
pub struct HmacAuthenticator {
    options: AuthenticationOptions,
    lookup: Arc<dyn SecretLookup>,
    nonces: Arc<dyn NonceCache>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for HmacAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacAuthenticator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl HmacAuthenticator {
    /// Create an authenticator driven by the system clock.
    pub fn new(
        options: AuthenticationOptions,
        lookup: Arc<dyn SecretLookup>,
        nonces: Arc<dyn NonceCache>,
    ) -> Self {
        Self::with_clock(options, lookup, nonces, Arc::new(SystemClock))
    }

    /// Create an authenticator driven by `clock`.
    pub fn with_clock(
        options: AuthenticationOptions,
        lookup: Arc<dyn SecretLookup>,
        nonces: Arc<dyn NonceCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            options,
            lookup,
            nonces,
            clock,
        }
    }

    /// The options this authenticator was built with.
    #[must_use]
    pub fn options(&self) -> &AuthenticationOptions {
        &self.options
    }

    /// Authenticate a request given its head and fully buffered body.
    ///
    /// Request-driven failures are returned as [`AuthenticateResult::Fail`].
    ///
    /// # Errors
    ///
    /// Returns [`HmacAuthError::InvalidArgument`](crate::HmacAuthError) only
    /// when a collaborator breaks its contract, e.g. the secret lookup returns
    /// an empty secret.
    pub async fn authenticate(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
    ) -> HmacAuthResult<AuthenticateResult> {
        let scheme = self.options.scheme_name();

        let Some(header) = extract_authorization(&parts.headers, scheme) else {
            return Ok(AuthenticateResult::NoResult);
        };

        let Some(request_date) = parts
            .headers
            .get(DATE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date)
        else {
            return Ok(fail(&header, AuthFailure::UnparsableDate));
        };

        if !within_drift(request_date, self.clock.now(), self.options.allowed_drift()) {
            return Ok(fail(&header, AuthFailure::DateDriftExceeded));
        }

        let nonce = parts
            .headers
            .get(NONCE_HEADER)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();

        if !nonce.is_empty() && !self.nonces.try_remember(&nonce, self.options.replay_ttl()) {
            return Ok(fail(&header, AuthFailure::AlreadyProcessed));
        }

        debug!(identity_id = %header.identity_id, "Looking up secret");
        let Some(secret) = self.lookup.lookup(&header.identity_id).await else {
            info!(identity_id = %header.identity_id, "No secret found");
            return Ok(fail(&header, AuthFailure::InvalidId));
        };

        let body = String::from_utf8_lossy(body);
        let canonical = build_canonical_string(
            request_date,
            &body,
            parts.method.as_str(),
            parts.uri.path(),
            parts.uri.query(),
            &nonce,
        )?;

        debug!(canonical = ?canonical, "Built canonical string");

        let expected = compute_signature(secret.as_bytes(), &canonical)?;

        debug!(signature = %expected, "Calculated server side signature");

        if signatures_match(&header.signature, &expected) {
            debug!(identity_id = %header.identity_id, "HMAC verification succeeded");
            let roles = self.options.roles_for(&header.identity_id);
            Ok(AuthenticateResult::Success(AuthenticatedIdentity::issue(
                header.identity_id,
                roles,
                scheme,
            )))
        } else {
            Ok(fail(&header, AuthFailure::InvalidSignature))
        }
    }
}

/// Extract the single `Authorization` header claimed by `scheme`.
fn extract_authorization(
    headers: &http::HeaderMap,
    scheme: &str,
) -> Option<AuthorizationHeaderValue> {
    let mut values = headers.get_all(http::header::AUTHORIZATION).iter();
    let (Some(value), None) = (values.next(), values.next()) else {
        return None;
    };

    AuthorizationHeaderValue::parse(value.to_str().ok()?, scheme)
}

/// Whether `date` lies in `[now - drift, now + drift]`. Bounds that overflow
/// the representable range are treated as open.
fn within_drift(date: DateTime<Utc>, now: DateTime<Utc>, drift: TimeDelta) -> bool {
    let not_too_old = now
        .checked_sub_signed(drift)
        .is_none_or(|earliest| date >= earliest);
    let not_too_new = now
        .checked_add_signed(drift)
        .is_none_or(|latest| date <= latest);
    not_too_old && not_too_new
}

fn fail(header: &AuthorizationHeaderValue, reason: AuthFailure) -> AuthenticateResult {
    debug!(identity_id = %header.identity_id, %reason, "HMAC authentication failed");
    AuthenticateResult::Fail(reason)
}
