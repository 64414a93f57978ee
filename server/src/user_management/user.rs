use attendance_protocol::{Identity, Role, UserProfile};
use serde::{Deserialize, Serialize};

use crate::authentication::PasswordHash;

use super::UserId;

/// One entry of `users.json`.
///
/// `password` holds an encoded [`PasswordHash`], or a plaintext in directories written by hand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredUser {
    pub password: String,
    pub role: Role,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct User {
    pub username: UserId,
    pub password: PasswordHash,
    pub role: Role,
    pub name: String,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            role: self.role,
            name: self.name.clone(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            role: self.role,
            name: self.name.clone(),
        }
    }
}
