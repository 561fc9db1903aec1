//! Hyper service layer enforcing HMAC request authentication.
//!
//! This crate wraps an application handler with the authentication pipeline
//! from `hmac-auth`, providing:
//!
//! - **Service**: Hyper `Service` that buffers the body, authenticates and forwards
//! - **Handler trait**: The boundary between the auth layer and the application
//! - **Response helpers**: Challenge and error responses with fixed bodies

pub mod handler;
pub mod response;
pub mod service;

pub use handler::{AuthHandler, AuthResponse};
pub use service::{AuthHttpConfig, AuthHttpService, REQUEST_ID_HEADER};
