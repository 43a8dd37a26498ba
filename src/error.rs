use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::modules::bookings::BookingError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref err) => match err {
                DatabaseError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
                DatabaseError::Duplicate => (StatusCode::CONFLICT, "Resource already exists"),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred",
                ),
            },
            AppError::Booking(ref err) => match err {
                BookingError::NotFound | BookingError::InstructorNotFound => {
                    (StatusCode::NOT_FOUND, "Resource not found")
                }
                BookingError::Forbidden => (StatusCode::FORBIDDEN, "Access denied"),
                BookingError::SlotUnavailable => (
                    StatusCode::CONFLICT,
                    "This time slot is no longer available",
                ),
                BookingError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "Status change not permitted")
                }
                BookingError::CancellationWindowClosed => (
                    StatusCode::BAD_REQUEST,
                    "Booking can no longer be cancelled",
                ),
                BookingError::InvalidState => (
                    StatusCode::BAD_REQUEST,
                    "Feedback is only accepted for completed sessions",
                ),
                BookingError::AlreadyRated => (
                    StatusCode::CONFLICT,
                    "Feedback has already been submitted",
                ),
                BookingError::InvalidTime(_) => (StatusCode::BAD_REQUEST, "Invalid session time"),
                BookingError::Database(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred",
                ),
            },
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "Authentication failed"),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, "Access denied"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "details": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
