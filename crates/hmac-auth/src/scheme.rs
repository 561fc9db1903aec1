//! Authentication scheme registry.
//!
//! Host adapters authenticate a request by asking a [`SchemeRegistry`], which
//! tries each registered [`AuthenticationScheme`] in registration order. A
//! scheme that does not recognise the request answers
//! [`AuthenticateResult::NoResult`] and the next one is tried; the first
//! `Success` or `Fail` is final.

use std::sync::Arc;

use tracing::debug;

use crate::error::{HmacAuthError, HmacAuthResult};
use crate::options::AuthenticationOptions;
use crate::pipeline::{AuthenticateResult, HmacAuthenticator};
use crate::replay::NonceCache;
use crate::secrets::SecretLookup;

/// A named strategy that may authenticate a request.
#[async_trait::async_trait]
pub trait AuthenticationScheme: Send + Sync {
    /// The scheme name, unique within a registry.
    fn name(&self) -> &str;

    /// Authenticate a request given its head and buffered body.
    async fn authenticate(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
    ) -> HmacAuthResult<AuthenticateResult>;
}

#[async_trait::async_trait]
impl AuthenticationScheme for HmacAuthenticator {
    fn name(&self) -> &str {
        self.options().scheme_name()
    }

    async fn authenticate(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
    ) -> HmacAuthResult<AuthenticateResult> {
        HmacAuthenticator::authenticate(self, parts, body).await
    }
}

/// Ordered set of authentication schemes keyed by name.
#[derive(Clone, Default)]
pub struct SchemeRegistry {
    schemes: Vec<Arc<dyn AuthenticationScheme>>,
}

impl std::fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemeRegistry")
            .field("schemes", &self.names())
            .finish()
    }
}

impl SchemeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding only the HMAC scheme.
    pub fn with_hmac(
        options: AuthenticationOptions,
        lookup: Arc<dyn SecretLookup>,
        nonces: Arc<dyn NonceCache>,
    ) -> Self {
        Self {
            schemes: vec![Arc::new(HmacAuthenticator::new(options, lookup, nonces))],
        }
    }

    /// Register a scheme.
    ///
    /// # Errors
    ///
    /// Returns [`HmacAuthError::InvalidArgument`] if a scheme with the same
    /// name is already registered.
    pub fn add_scheme(&mut self, scheme: Arc<dyn AuthenticationScheme>) -> HmacAuthResult<()> {
        if self.get(scheme.name()).is_some() {
            return Err(HmacAuthError::invalid_argument(format!(
                "scheme {:?} is already registered",
                scheme.name()
            )));
        }
        self.schemes.push(scheme);
        Ok(())
    }

    /// Look up a scheme by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn AuthenticationScheme>> {
        self.schemes.iter().find(|s| s.name() == name)
    }

    /// Registered scheme names in evaluation order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.schemes.iter().map(|s| s.name()).collect()
    }

    /// Run the registered schemes in order until one claims the request.
    ///
    /// # Errors
    ///
    /// Propagates the first contract error raised by a scheme.
    pub async fn authenticate(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
    ) -> HmacAuthResult<AuthenticateResult> {
        for scheme in &self.schemes {
            let result = scheme.authenticate(parts, body).await?;
            if result != AuthenticateResult::NoResult {
                debug!(
                    scheme = scheme.name(),
                    success = result.is_success(),
                    "Scheme claimed request"
                );
                return Ok(result);
            }
        }
        Ok(AuthenticateResult::NoResult)
    }
}
