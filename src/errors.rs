use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::lifecycle::TransitionError;
use crate::services::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("{0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Transition(e) => match e {
                TransitionError::InvalidTransition { .. } => StatusCode::CONFLICT,
                TransitionError::NotFound(_) => StatusCode::NOT_FOUND,
                TransitionError::PersistenceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                TransitionError::Unauthenticated => StatusCode::UNAUTHORIZED,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, Role};

    #[test]
    fn test_transition_errors_map_to_distinct_statuses() {
        let invalid = AppError::from(TransitionError::InvalidTransition {
            from: BookingStatus::Pending,
            requested: BookingStatus::Accepted,
            role: Role::Customer,
        });
        assert_eq!(invalid.status(), StatusCode::CONFLICT);

        let missing = AppError::from(TransitionError::NotFound("b1".to_string()));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let offline = AppError::from(TransitionError::PersistenceUnavailable(
            StoreError::Unavailable("offline".to_string()),
        ));
        assert_eq!(offline.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = AppError::from(TransitionError::InvalidTransition {
            from: BookingStatus::Pending,
            requested: BookingStatus::Accepted,
            role: Role::Customer,
        });
        assert_eq!(
            err.to_string(),
            "a customer cannot move a booking from pending to accepted"
        );
    }
}
