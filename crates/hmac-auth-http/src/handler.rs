//! Inner application handler trait.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_body_util::Full;

/// Response type produced by handlers and by the service itself.
pub type AuthResponse = http::Response<Full<Bytes>>;

/// The application behind the authentication layer.
///
/// The handler receives the request with its body already buffered, so it can
/// read the same bytes the signature was verified against. On successful
/// authentication the request extensions hold an
/// [`AuthenticatedIdentity`](hmac_auth::AuthenticatedIdentity).
pub trait AuthHandler: Send + Sync + 'static {
    /// Handle an authenticated (or, if allowed, anonymous) request.
    fn handle(
        &self,
        req: http::Request<Bytes>,
    ) -> Pin<Box<dyn Future<Output = AuthResponse> + Send>>;
}
