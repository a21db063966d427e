//! Mapping of domain errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use repometer_core::{SubjectError, TriggerRejected};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed API call: status code plus message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        }
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<SubjectError> for ApiError {
    fn from(err: SubjectError) -> Self {
        let status = match &err {
            SubjectError::EmptySelection
            | SubjectError::TooManyRepositories { .. }
            | SubjectError::UnknownRepositories(_)
            | SubjectError::TeamTooSmall { .. }
            | SubjectError::TeamTooLarge { .. }
            | SubjectError::RequesterNotMember
            | SubjectError::UnknownMembers(_)
            | SubjectError::InvalidTeamName(_) => StatusCode::BAD_REQUEST,
            SubjectError::ProfileUnavailable => StatusCode::UNAUTHORIZED,
            SubjectError::IdentityMismatch { .. } | SubjectError::NotAMember(_) => {
                StatusCode::FORBIDDEN
            }
            SubjectError::UnknownUser(_) | SubjectError::UnknownTeam(_) => StatusCode::NOT_FOUND,
            SubjectError::TeamExists(_) | SubjectError::InProgress => StatusCode::CONFLICT,
            SubjectError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<TriggerRejected> for ApiError {
    fn from(err: TriggerRejected) -> Self {
        let status = match &err {
            TriggerRejected::UnknownSubject(_) => StatusCode::NOT_FOUND,
            TriggerRejected::NoRepositoriesSelected => StatusCode::BAD_REQUEST,
            TriggerRejected::AlreadyInProgress => StatusCode::CONFLICT,
            TriggerRejected::NotAMember(_) => StatusCode::FORBIDDEN,
            TriggerRejected::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}
