//! Secret lookup trait and implementations.
//!
//! This module defines the [`SecretLookup`] trait for resolving the shared
//! secret of an identity, along with a [`StaticSecretLookup`] for testing and
//! development use cases.

use std::collections::HashMap;

/// Trait for looking up the shared secret of an identity.
///
/// Implementations may back this with a database, a secrets manager or any
/// other store. Unknown identities and store failures both resolve to `None`;
/// implementations own their own timeout policy.
#[async_trait::async_trait]
pub trait SecretLookup: Send + Sync {
    /// Retrieve the secret for `id`, or `None` if there is none.
    async fn lookup(&self, id: &str) -> Option<String>;
}

/// A simple in-memory secret lookup backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use hmac_auth::secrets::StaticSecretLookup;
///
/// let lookup = StaticSecretLookup::new(vec![("acct-1".to_owned(), "s3cr3t".to_owned())]);
/// assert_eq!(lookup.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSecretLookup {
    secrets: HashMap<String, String>,
}

impl StaticSecretLookup {
    /// Create a new `StaticSecretLookup` from (id, secret) pairs.
    pub fn new(secrets: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            secrets: secrets.into_iter().collect(),
        }
    }

    /// Number of registered identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether no identities are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait::async_trait]
impl SecretLookup for StaticSecretLookup {
    async fn lookup(&self, id: &str) -> Option<String> {
        self.secrets.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_return_secret_for_known_id() {
        let lookup = StaticSecretLookup::new(vec![("id".to_owned(), "secret".to_owned())]);
        assert_eq!(lookup.lookup("id").await.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_should_return_none_for_unknown_id() {
        let lookup = StaticSecretLookup::new(vec![]);
        assert!(lookup.is_empty());
        assert_eq!(lookup.lookup("UNKNOWN").await, None);
    }
}
