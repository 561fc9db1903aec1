//! Authentication options.

use std::sync::Arc;

use chrono::TimeDelta;

/// The fixed name of the HMAC authentication scheme.
pub const DEFAULT_SCHEME: &str = "HMAC";

/// Default tolerance between the request `Date` and now.
pub const DEFAULT_ALLOWED_DRIFT: TimeDelta = TimeDelta::minutes(5);

/// Maps an authenticated identity to its roles. Absent means no roles.
pub type RoleResolver = Arc<dyn Fn(&str) -> Option<Vec<String>> + Send + Sync>;

/// Options for the HMAC authentication scheme.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use chrono::TimeDelta;
/// use hmac_auth::AuthenticationOptions;
///
/// let options = AuthenticationOptions::default()
///     .with_allowed_drift(TimeDelta::minutes(2))
///     .with_role_resolver(Arc::new(|id: &str| {
///         (id == "admin").then(|| vec!["admin".to_owned()])
///     }));
/// assert_eq!(options.scheme_name(), "HMAC");
/// assert_eq!(options.replay_ttl(), TimeDelta::minutes(4));
/// ```
#[derive(Clone)]
pub struct AuthenticationOptions {
    allowed_drift: TimeDelta,
    role_resolver: Option<RoleResolver>,
}

impl std::fmt::Debug for AuthenticationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationOptions")
            .field("scheme_name", &DEFAULT_SCHEME)
            .field("allowed_drift", &self.allowed_drift)
            .field("role_resolver", &self.role_resolver.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Default for AuthenticationOptions {
    fn default() -> Self {
        Self {
            allowed_drift: DEFAULT_ALLOWED_DRIFT,
            role_resolver: None,
        }
    }
}

impl AuthenticationOptions {
    /// Set the allowed clock drift. Negative values are treated as zero.
    #[must_use]
    pub fn with_allowed_drift(mut self, drift: TimeDelta) -> Self {
        self.allowed_drift = drift.max(TimeDelta::zero());
        self
    }

    /// Attach a role resolver.
    #[must_use]
    pub fn with_role_resolver(mut self, resolver: RoleResolver) -> Self {
        self.role_resolver = Some(resolver);
        self
    }

    /// The scheme name, always [`DEFAULT_SCHEME`].
    #[must_use]
    pub fn scheme_name(&self) -> &'static str {
        DEFAULT_SCHEME
    }

    /// The allowed clock drift.
    #[must_use]
    pub fn allowed_drift(&self) -> TimeDelta {
        self.allowed_drift
    }

    /// How long a nonce stays in the replay cache: twice the allowed drift,
    /// so a nonce outlives every window in which its request could be valid.
    #[must_use]
    pub fn replay_ttl(&self) -> TimeDelta {
        self.allowed_drift
            .checked_add(&self.allowed_drift)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Resolve roles for `id`, if a resolver is configured.
    #[must_use]
    pub fn roles_for(&self, id: &str) -> Option<Vec<String>> {
        self.role_resolver.as_ref().and_then(|resolve| resolve(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_default_to_five_minutes_and_no_roles() {
        let options = AuthenticationOptions::default();
        assert_eq!(options.scheme_name(), "HMAC");
        assert_eq!(options.allowed_drift(), TimeDelta::minutes(5));
        assert_eq!(options.replay_ttl(), TimeDelta::minutes(10));
        assert_eq!(options.roles_for("anyone"), None);
    }

    #[test]
    fn test_should_clamp_negative_drift() {
        let options = AuthenticationOptions::default().with_allowed_drift(TimeDelta::seconds(-1));
        assert_eq!(options.allowed_drift(), TimeDelta::zero());
    }

    #[test]
    fn test_should_saturate_replay_ttl() {
        let options = AuthenticationOptions::default().with_allowed_drift(TimeDelta::MAX);
        assert_eq!(options.replay_ttl(), TimeDelta::MAX);
    }

    #[test]
    fn test_should_resolve_roles() {
        let options = AuthenticationOptions::default().with_role_resolver(Arc::new(|id: &str| {
            Some(vec![format!("role-of-{id}")])
        }));
        assert_eq!(
            options.roles_for("acct-1"),
            Some(vec!["role-of-acct-1".to_owned()])
        );
    }
}
