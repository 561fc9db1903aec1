//! Echo handler reporting the authenticated identity.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use hmac_auth::AuthenticatedIdentity;
use hmac_auth_http::{AuthHandler, AuthResponse};
use http::{HeaderValue, StatusCode};
use http_body_util::Full;
use serde_json::json;

/// Responds with a JSON summary of the request and the identity that signed it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl AuthHandler for EchoHandler {
    fn handle(
        &self,
        req: http::Request<Bytes>,
    ) -> Pin<Box<dyn Future<Output = AuthResponse> + Send>> {
        let identity = req.extensions().get::<AuthenticatedIdentity>().map(|i| {
            json!({
                "id": i.id,
                "roles": i.roles,
                "scheme": i.scheme,
            })
        });
        let payload = json!({
            "authenticated": identity.is_some(),
            "identity": identity,
            "method": req.method().as_str(),
            "path": req.uri().path(),
            "query": req.uri().query(),
            "body": String::from_utf8_lossy(req.body()),
        });

        Box::pin(async move { json_response(StatusCode::OK, &payload) })
    }
}

fn json_response(status: StatusCode, value: &serde_json::Value) -> AuthResponse {
    let mut response = http::Response::new(Full::new(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
