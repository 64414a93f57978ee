//! Checks who is talking to us
//!
//! Credentials arrive either as a `/login` body or as an `Authorization: Basic` header on every other request.

use attendance_protocol::Credentials;
use base64::Engine as _;
use thiserror::Error;

mod password;
mod service;

pub use password::{HashError, PasswordHash};
pub use service::AuthenticationService;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Username and password are required")]
    MissingCredentials,

    /// Unknown user and wrong password are deliberately indistinguishable.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    MissingAuthorization,
}

/// Extracts username and password from an `Authorization` header value
pub fn basic_credentials(header: &str) -> Option<Credentials> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Credentials {
        username: username.into(),
        password: password.into(),
    })
}
