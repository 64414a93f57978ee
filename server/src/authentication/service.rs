use attendance_protocol::Identity;
use tracing::{debug, warn};

use std::sync::Arc;

use super::{basic_credentials, AuthError, HashError, PasswordHash};
use crate::user_management::UserManaging;

/// The auth gate in front of everything that touches attendance data.
pub struct AuthenticationService {
    users: Arc<dyn UserManaging>,
    decoy: PasswordHash,
}

impl AuthenticationService {
    pub fn new(users: Arc<dyn UserManaging>) -> Result<Self, HashError> {
        Ok(AuthenticationService {
            users,
            decoy: PasswordHash::new("decoy")?,
        })
    }

    #[tracing::instrument(level = tracing::Level::DEBUG, skip(self, password))]
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let verified = match self.users.credential(username) {
            Some(hash) => hash.verify(password),
            None => {
                // same amount of hashing as for a known user
                let _ = self.decoy.verify(password);
                false
            }
        };

        if !verified {
            warn!("rejected credentials for {:?}", username);
            return Err(AuthError::InvalidCredentials);
        }

        let identity = self.users.who_is(username).ok_or(AuthError::InvalidCredentials)?;
        debug!("authenticated {} as {:?}", identity.username, identity.role);
        Ok(identity)
    }

    /// Authenticates the value of an `Authorization` header.
    pub fn authenticate_header(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let credentials = header
            .and_then(basic_credentials)
            .ok_or(AuthError::MissingAuthorization)?;

        self.authenticate(&credentials.username, &credentials.password)
            .map_err(|error| match error {
                AuthError::MissingCredentials => AuthError::MissingAuthorization,
                error => error,
            })
    }
}
