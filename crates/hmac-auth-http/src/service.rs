//! Authenticating HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use hmac_auth::{AuthenticateResult, SchemeRegistry};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use tracing::{debug, error, warn};

use crate::handler::{AuthHandler, AuthResponse};
use crate::response::{bad_request, internal_error, unauthorized};

/// Header carrying the per-request id on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Configuration for the authenticating HTTP service.
#[derive(Debug, Clone)]
pub struct AuthHttpConfig {
    /// Reject requests no scheme claims. When `false`, such requests reach the
    /// handler without an identity.
    pub require_authentication: bool,
    /// Scheme named in the `WWW-Authenticate` challenge.
    pub challenge_scheme: String,
}

impl Default for AuthHttpConfig {
    fn default() -> Self {
        Self {
            require_authentication: true,
            challenge_scheme: hmac_auth::DEFAULT_SCHEME.to_owned(),
        }
    }
}

/// Hyper `Service` that authenticates requests before handing them to an
/// [`AuthHandler`].
#[derive(Debug)]
pub struct AuthHttpService<H: AuthHandler> {
    handler: Arc<H>,
    registry: Arc<SchemeRegistry>,
    config: Arc<AuthHttpConfig>,
}

impl<H: AuthHandler> AuthHttpService<H> {
    /// Create a new `AuthHttpService`.
    pub fn new(handler: Arc<H>, registry: SchemeRegistry, config: AuthHttpConfig) -> Self {
        Self {
            handler,
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }
}

impl<H: AuthHandler> Clone for AuthHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: AuthHandler> hyper::service::Service<http::Request<Incoming>> for AuthHttpService<H> {
    type Response = AuthResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let registry = Arc::clone(&self.registry);
        let config = Arc::clone(&self.config);
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response =
                process_request(req, handler.as_ref(), &registry, &config, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Run one request through body buffering, authentication and the handler.
///
/// If the client goes away, hyper drops this future and any in-flight body
/// read or secret lookup is abandoned with it.
pub async fn process_request<B, H>(
    req: http::Request<B>,
    handler: &H,
    registry: &SchemeRegistry,
    config: &AuthHttpConfig,
    request_id: &str,
) -> AuthResponse
where
    B: http_body::Body,
    B::Error: Display,
    H: AuthHandler,
{
    let (mut parts, incoming) = req.into_parts();

    // 1. Buffer the body so it can be both verified and handed on.
    let body = match collect_body(incoming).await {
        Ok(body) => body,
        Err(e) => {
            warn!(request_id, error = %e, "failed to read request body");
            return bad_request();
        }
    };

    // 2. Authenticate.
    match registry.authenticate(&parts, &body).await {
        Ok(AuthenticateResult::Success(identity)) => {
            debug!(request_id, identity_id = %identity.id, "request authenticated");
            parts.extensions.insert(identity);
        }
        Ok(AuthenticateResult::Fail(reason)) => {
            warn!(request_id, %reason, "authentication failed");
            return unauthorized(&config.challenge_scheme);
        }
        Ok(AuthenticateResult::NoResult) => {
            if config.require_authentication {
                debug!(request_id, "no scheme claimed the request");
                return unauthorized(&config.challenge_scheme);
            }
        }
        Err(e) => {
            error!(request_id, error = %e, "authentication contract violated");
            return internal_error();
        }
    }

    // 3. Dispatch with the buffered body.
    handler.handle(http::Request::from_parts(parts, body)).await
}

/// Collect the incoming body into a single `Bytes` buffer.
async fn collect_body<B>(incoming: B) -> Result<Bytes, B::Error>
where
    B: http_body::Body,
{
    incoming
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
}

/// Add common response headers to every response.
fn add_common_headers(mut response: AuthResponse, request_id: &str) -> AuthResponse {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }

    response
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use hmac_auth::{
        AuthenticatedIdentity, AuthenticationOptions, HmacAuthenticator, ManualClock,
        MemoryNonceCache, RequestSigner, StaticSecretLookup,
    };
    use http::StatusCode;
    use http_body_util::Full;

    use super::*;

    const TEST_ID: &str = "acct-1";
    const TEST_SECRET: &str = "s3cr3t";

    /// Echoes `<identity-or-anonymous>|<body>`.
    struct EchoHandler;

    impl AuthHandler for EchoHandler {
        fn handle(
            &self,
            req: http::Request<Bytes>,
        ) -> Pin<Box<dyn Future<Output = AuthResponse> + Send>> {
            let who = req
                .extensions()
                .get::<AuthenticatedIdentity>()
                .map_or_else(|| "anonymous".to_owned(), |i| i.id.clone());
            let body = String::from_utf8_lossy(req.body()).into_owned();
            let response = http::Response::new(Full::new(Bytes::from(format!("{who}|{body}"))));
            Box::pin(async move { response })
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn registry(clock: Arc<ManualClock>) -> SchemeRegistry {
        registry_with_secret(clock, TEST_SECRET)
    }

    fn registry_with_secret(clock: Arc<ManualClock>, secret: &str) -> SchemeRegistry {
        let mut registry = SchemeRegistry::new();
        registry
            .add_scheme(Arc::new(HmacAuthenticator::with_clock(
                AuthenticationOptions::default(),
                Arc::new(StaticSecretLookup::new(vec![(
                    TEST_ID.to_owned(),
                    secret.to_owned(),
                )])),
                Arc::new(MemoryNonceCache::with_clock(clock.clone())),
                clock,
            )))
            .unwrap();
        registry
    }

    fn signed_request(clock: Arc<ManualClock>, body: &'static str) -> http::Request<Full<Bytes>> {
        let mut request = http::Request::builder()
            .method("POST")
            .uri("/orders?page=2")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap();
        RequestSigner::with_clock(clock)
            .attach_signature(&mut request, TEST_ID, TEST_SECRET, body.as_bytes())
            .unwrap();
        request
    }

    /// A request body that fails on first read.
    struct BrokenBody;

    impl http_body::Body for BrokenBody {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
            std::task::Poll::Ready(Some(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            ))))
        }
    }

    async fn body_text(response: AuthResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_should_forward_authenticated_request_with_readable_body() {
        let clock = clock();
        let registry = registry(clock.clone());
        let request = signed_request(clock, "{\"qty\":1}");

        let response = process_request(
            request,
            &EchoHandler,
            &registry,
            &AuthHttpConfig::default(),
            "req-1",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "acct-1|{\"qty\":1}");
    }

    #[tokio::test]
    async fn test_should_reject_failed_authentication_without_leaking_reason() {
        let clock = clock();
        let registry = registry(clock.clone());
        let mut request = signed_request(clock, "{}");
        *request.body_mut() = Full::new(Bytes::from_static(b"{\"tampered\":true}"));

        let response = process_request(
            request,
            &EchoHandler,
            &registry,
            &AuthHttpConfig::default(),
            "req-2",
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[http::header::WWW_AUTHENTICATE], "HMAC");
        assert_eq!(body_text(response).await, "Unauthorized");
    }

    #[tokio::test]
    async fn test_should_reject_unclaimed_request_when_required() {
        let registry = registry(clock());
        let request = http::Request::builder()
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = process_request(
            request,
            &EchoHandler,
            &registry,
            &AuthHttpConfig::default(),
            "req-3",
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_forward_unclaimed_request_when_optional() {
        let registry = registry(clock());
        let request = http::Request::builder()
            .uri("/")
            .body(Full::new(Bytes::from_static(b"hi")))
            .unwrap();
        let config = AuthHttpConfig {
            require_authentication: false,
            ..AuthHttpConfig::default()
        };

        let response = process_request(request, &EchoHandler, &registry, &config, "req-4").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "anonymous|hi");
    }

    #[tokio::test]
    async fn test_should_reject_replayed_request() {
        let clock = clock();
        let registry = registry(clock.clone());
        let first = signed_request(clock, "");
        let (parts, body) = first.into_parts();
        let replay = http::Request::from_parts(parts.clone(), body.clone());
        let first = http::Request::from_parts(parts, body);

        let config = AuthHttpConfig::default();
        let ok = process_request(first, &EchoHandler, &registry, &config, "a").await;
        let replayed = process_request(replay, &EchoHandler, &registry, &config, "b").await;

        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(replayed.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_answer_bad_request_when_body_read_fails() {
        let registry = registry(clock());
        let request = http::Request::builder()
            .method("POST")
            .uri("/orders")
            .body(BrokenBody)
            .unwrap();

        let response = process_request(
            request,
            &EchoHandler,
            &registry,
            &AuthHttpConfig::default(),
            "req-5",
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Bad Request");
    }

    #[tokio::test]
    async fn test_should_answer_internal_error_when_lookup_returns_empty_secret() {
        let clock = clock();
        let registry = registry_with_secret(clock.clone(), "");
        let request = signed_request(clock, "{}");

        let response = process_request(
            request,
            &EchoHandler,
            &registry,
            &AuthHttpConfig::default(),
            "req-6",
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Internal Server Error");
    }

    #[test]
    fn test_should_add_request_id_header() {
        let response = add_common_headers(http::Response::new(Full::new(Bytes::new())), "rid");
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "rid");
    }
}
