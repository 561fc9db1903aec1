//! Error types for HMAC authentication.
//!
//! There are two families:
//!
//! - [`AuthFailure`] describes why a request was not authenticated. It is
//!   carried inside [`AuthenticateResult::Fail`](crate::AuthenticateResult)
//!   and never returned as an `Err`.
//! - [`HmacAuthError`] signals a broken collaborator contract (a default
//!   date, an empty secret, a header value that cannot be represented).

/// Contract violations raised by the canonicalizer, signer and pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HmacAuthError {
    /// An argument violated the documented contract of the callee.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl HmacAuthError {
    /// Shorthand for [`HmacAuthError::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Reasons a request claimed by the HMAC scheme failed to authenticate.
///
/// The messages are diagnostics for logs and must not be echoed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// The `Date` header is missing or not RFC 1123.
    #[error("Unable to parse Date header")]
    UnparsableDate,

    /// The `Date` header is outside the allowed drift around now.
    #[error("date drift exceeded")]
    DateDriftExceeded,

    /// The nonce has been seen within the replay window.
    #[error("already processed")]
    AlreadyProcessed,

    /// No secret is registered for the identity.
    #[error("invalid id")]
    InvalidId,

    /// The computed signature differs from the provided one.
    #[error("invalid signature")]
    InvalidSignature,
}

/// Convenience result type for contract-checked operations.
pub type HmacAuthResult<T> = Result<T, HmacAuthError>;
