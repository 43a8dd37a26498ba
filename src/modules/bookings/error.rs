use thiserror::Error;

use crate::db::models::BookingStatus;
use crate::db::DatabaseError;

/// Domain-rule violations surfaced by the booking engine. Every variant is a
/// typed failure returned to the caller; none is silently swallowed.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,

    #[error("Instructor not found")]
    InstructorNotFound,

    #[error("Not authorized to modify this booking")]
    Forbidden,

    #[error("This time slot is no longer available")]
    SlotUnavailable,

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Booking starts in less than 24 hours and can no longer be cancelled")]
    CancellationWindowClosed,

    #[error("Feedback is only accepted for completed sessions")]
    InvalidState,

    #[error("Feedback has already been submitted for this booking")]
    AlreadyRated,

    #[error("Invalid session time: {0}")]
    InvalidTime(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        BookingError::Database(DatabaseError::from_sqlx(err))
    }
}
