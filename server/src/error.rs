use attendance_protocol::ParseError;
use thiserror::Error;
use warp::http::StatusCode;

use crate::{attendance::StoreError, authentication::AuthError, policy::AuthorizationError};

/// Everything a request can fail with
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ParseError),

    #[error(transparent)]
    Authentication(#[from] AuthError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Validation(error) => ApiError::Validation(error),
            error => ApiError::Storage(error),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(AuthError::MissingCredentials) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the client gets to see, storage details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Storage(_) => String::from("Internal server error"),
            error => error.to_string(),
        }
    }
}

impl warp::reject::Reject for ApiError {}
