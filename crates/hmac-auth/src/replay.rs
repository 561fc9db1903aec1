//! Nonce replay protection.
//!
//! [`NonceCache`] is the contract the pipeline relies on: a set of nonces
//! with per-entry expiry. [`MemoryNonceCache`] is the in-process
//! implementation. A single-process cache does not protect against replay
//! across independently running instances; deployments behind a load
//! balancer should supply a shared implementation.
//!
//! Empty nonces are never stored and never reported as seen.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::clock::{Clock, SystemClock};

/// A time-bounded set of recently seen nonces.
pub trait NonceCache: Send + Sync {
    /// Whether `nonce` is present and unexpired.
    fn seen(&self, nonce: &str) -> bool;

    /// Insert or refresh `nonce` so that it expires `ttl` from now.
    fn remember(&self, nonce: &str, ttl: TimeDelta);

    /// Record `nonce` unless it is already live.
    ///
    /// Returns `true` if the nonce was recorded by this call and `false` if a
    /// live entry already existed. Of any number of concurrent calls for the
    /// same nonce, at most one returns `true`.
    ///
    /// The default implementation is only as atomic as `seen` followed by
    /// `remember`; implementations should override it.
    fn try_remember(&self, nonce: &str, ttl: TimeDelta) -> bool {
        if self.seen(nonce) {
            return false;
        }
        self.remember(nonce, ttl);
        true
    }
}

/// In-memory [`NonceCache`] backed by a `DashMap`.
///
/// Expired entries are dropped when touched and in bulk by
/// [`MemoryNonceCache::purge_expired`].
///
/// # Examples
///
/// ```
/// use chrono::TimeDelta;
/// use hmac_auth::replay::{MemoryNonceCache, NonceCache};
///
/// let cache = MemoryNonceCache::new();
/// assert!(cache.try_remember("abc123", TimeDelta::minutes(10)));
/// assert!(cache.seen("abc123"));
/// assert!(!cache.try_remember("abc123", TimeDelta::minutes(10)));
/// ```
pub struct MemoryNonceCache {
    entries: DashMap<String, DateTime<Utc>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MemoryNonceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNonceCache")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl MemoryNonceCache {
    /// Create an empty cache driven by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty cache driven by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `now + ttl`, saturating at the latest representable instant.
fn expiry(now: DateTime<Utc>, ttl: TimeDelta) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Default for MemoryNonceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceCache for MemoryNonceCache {
    fn seen(&self, nonce: &str) -> bool {
        if nonce.is_empty() {
            return false;
        }

        let now = self.clock.now();
        let live = match self.entries.get(nonce) {
            Some(expires_at) => *expires_at > now,
            None => return false,
        };
        if !live {
            self.entries.remove_if(nonce, |_, expires_at| *expires_at <= now);
        }
        live
    }

    fn remember(&self, nonce: &str, ttl: TimeDelta) {
        if nonce.is_empty() {
            return;
        }

        let expires_at = expiry(self.clock.now(), ttl);
        self.entries.insert(nonce.to_owned(), expires_at);
    }

    fn try_remember(&self, nonce: &str, ttl: TimeDelta) -> bool {
        if nonce.is_empty() {
            return false;
        }

        let now = self.clock.now();
        let expires_at = expiry(now, ttl);

        // The entry guard holds the shard lock, so check-and-insert is atomic.
        match self.entries.entry(nonce.to_owned()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    false
                } else {
                    entry.insert(expires_at);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                true
            }
        }
    }
}
