//! Symmetric-key HMAC request authentication.
//!
//! Each request carries a signature computed with a per-identity secret over
//! a canonical representation of the request, plus a timestamp and nonce to
//! prevent replay. This crate implements both sides of that contract.
//!
//! # Overview
//!
//! The client attaches three headers:
//!
//! ```text
//! Date: Mon, 01 Jan 2024 00:00:00 GMT
//! Nonce: 7b0c6f0e-2b8c-4c59-9a59-0f1c3f1b0d2e
//! Authorization: HMAC <identity-id>:<Base64(HMAC-SHA256(secret, canonical))>
//! ```
//!
//! The server rebuilds the canonical string from the received request,
//! checks the date against an allowed drift, rejects replayed nonces,
//! resolves the secret for the identity and compares signatures.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use hmac_auth::{
//!     AuthenticationOptions, HmacAuthenticator, MemoryNonceCache, RequestSigner,
//!     StaticSecretLookup,
//! };
//!
//! // Server side
//! let authenticator = HmacAuthenticator::new(
//!     AuthenticationOptions::default(),
//!     Arc::new(StaticSecretLookup::new(vec![("acct-1".to_owned(), "s3cr3t".to_owned())])),
//!     Arc::new(MemoryNonceCache::new()),
//! );
//!
//! // Client side
//! let mut request = http::Request::builder().uri("/orders").body(()).unwrap();
//! RequestSigner::new().attach_signature(&mut request, "acct-1", "s3cr3t", b"").unwrap();
//!
//! // Host side, with the request head and buffered body
//! # tokio_test::block_on(async {
//! let (parts, ()) = request.into_parts();
//! let result = authenticator.authenticate(&parts, b"").await.unwrap();
//! assert_eq!(result.identity().unwrap().id, "acct-1");
//! # });
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical string construction and HTTP date handling
//! - [`clock`] - Injectable time sources
//! - [`error`] - Failure reasons and contract errors
//! - [`header`] - Header names and `Authorization` parsing
//! - [`options`] - Scheme options
//! - [`pipeline`] - Request verification
//! - [`replay`] - Nonce replay cache
//! - [`scheme`] - Scheme trait and registry
//! - [`secrets`] - Secret lookup trait and in-memory implementation
//! - [`signature`] - HMAC-SHA256 signature computation
//! - [`signer`] - Client-side request signing

pub mod canonical;
pub mod clock;
pub mod error;
pub mod header;
pub mod options;
pub mod pipeline;
pub mod replay;
pub mod scheme;
pub mod secrets;
pub mod signature;
pub mod signer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthFailure, HmacAuthError, HmacAuthResult};
pub use options::{AuthenticationOptions, DEFAULT_SCHEME, RoleResolver};
pub use pipeline::{AuthenticateResult, AuthenticatedIdentity, HmacAuthenticator};
pub use replay::{MemoryNonceCache, NonceCache};
pub use scheme::{AuthenticationScheme, SchemeRegistry};
pub use secrets::{SecretLookup, StaticSecretLookup};
pub use signer::{OutgoingRequest, RequestSigner, SignedHeaders};
