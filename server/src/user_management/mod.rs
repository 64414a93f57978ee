//! Communicates profile and Authentication Data
//!
//! The directory is loaded once at startup and never changes while the server runs.

use attendance_protocol::{Identity, UserProfile};

use std::collections::BTreeMap;

use crate::authentication::PasswordHash;

mod naive;
pub mod user;

pub use naive::NaiveUserManager;
pub use user::{StoredUser, User};

pub type UserId = String;

pub trait UserManaging: Send + Sync {
    fn who_is(&self, user_id: &str) -> Option<Identity>;

    fn credential(&self, user_id: &str) -> Option<&PasswordHash>;

    /// Everybody, without credentials.
    fn profiles(&self) -> BTreeMap<UserId, UserProfile>;
}
