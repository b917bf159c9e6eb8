use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::dao::storage::StorageError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client; rejected before reaching the store.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state; rejected before reaching the store.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The store refused the pick because another selection holds the club.
    #[error("club `{club_id}` has already been selected by another player")]
    ClubTaken { club_id: String },
    /// The store refused the pick because the user already owns a selection.
    #[error("`{user_name}` has already selected a club")]
    AlreadySelected { user_name: String },
    /// Any other failed write.
    #[error("write failed")]
    WriteFailed(#[source] StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::WriteFailed(err)
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The backing store failed to apply a write.
    #[error("upstream failure: {0}")]
    Upstream(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::ClubTaken { .. } => AppError::Conflict(
                "This club has already been selected by another player!".into(),
            ),
            ServiceError::AlreadySelected { .. } => AppError::Conflict(
                "You have already selected a club. You cannot change it.".into(),
            ),
            ServiceError::WriteFailed(source) => {
                warn!(error = %source, "store write failed");
                AppError::Upstream("Failed to save your change. Please try again.".into())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::storage::UniqueField;

    #[test]
    fn club_taken_maps_to_conflict() {
        let err: AppError = ServiceError::ClubTaken {
            club_id: "ars".into(),
        }
        .into();
        assert!(matches!(err, AppError::Conflict(ref m) if m.contains("already been selected")));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn generic_write_failure_hides_the_source() {
        let storage = StorageError::UniqueViolation {
            field: UniqueField::ClubId,
        };
        let err: AppError = ServiceError::WriteFailed(storage).into();
        match err {
            AppError::Upstream(message) => assert!(message.contains("try again")),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn degraded_maps_to_service_unavailable() {
        let err: AppError = ServiceError::Degraded.into();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
