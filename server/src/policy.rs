//! Who may change which record
//!
//! Users may only mark themselves present. Admins may set any record to any status.

use attendance_protocol::{Identity, RecordKey, Status};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("You may only change your own attendance")]
    ForeignRecord,

    #[error("You may only mark yourself present")]
    SelfAbsence,

    #[error("Only admins may do this")]
    AdminOnly,
}

pub fn authorize_update(identity: &Identity, key: &RecordKey, status: Status) -> Result<(), AuthorizationError> {
    if identity.is_admin() {
        return Ok(());
    }
    if key.username() != identity.username {
        return Err(AuthorizationError::ForeignRecord);
    }
    match status {
        Status::Present => Ok(()),
        Status::Absent => Err(AuthorizationError::SelfAbsence),
    }
}

pub fn require_admin(identity: &Identity) -> Result<(), AuthorizationError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(AuthorizationError::AdminOnly)
    }
}
