//! Canned responses for requests that never reach the handler.
//!
//! Bodies are fixed strings; failure reasons stay in the logs.

use bytes::Bytes;
use http::{HeaderValue, StatusCode};
use http_body_util::Full;

use crate::handler::AuthResponse;

/// Build a plain-text response.
#[must_use]
pub fn text_response(status: StatusCode, text: &'static str) -> AuthResponse {
    let mut response = http::Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// `401 Unauthorized` with a `WWW-Authenticate` challenge for `scheme`.
#[must_use]
pub fn unauthorized(scheme: &str) -> AuthResponse {
    let mut response = text_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    if let Ok(challenge) = HeaderValue::from_str(scheme) {
        response
            .headers_mut()
            .insert(http::header::WWW_AUTHENTICATE, challenge);
    }
    response
}

/// `400 Bad Request` for bodies that could not be read.
#[must_use]
pub fn bad_request() -> AuthResponse {
    text_response(StatusCode::BAD_REQUEST, "Bad Request")
}

/// `500 Internal Server Error` for broken collaborator contracts.
#[must_use]
pub fn internal_error() -> AuthResponse {
    text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_challenge_with_scheme() {
        let response = unauthorized("HMAC");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[http::header::WWW_AUTHENTICATE], "HMAC");
    }

    #[test]
    fn test_should_set_plain_text_content_type() {
        let response = bad_request();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[http::header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }
}
