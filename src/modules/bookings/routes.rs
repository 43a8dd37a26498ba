use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::app_state::AppState;

use super::handlers::{
    add_booking_feedback, available_slots, cancel_booking, create_booking,
    get_booking_by_confirmation, get_instructor_bookings, get_user_bookings,
    update_booking_status,
};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        // Public: slot discovery and confirmation-code lookup.
        .route("/available-slots", get(available_slots))
        .route("/confirmation/:confirmation_code", get(get_booking_by_confirmation))
        // Authenticated booking lifecycle.
        .route("/", post(create_booking))
        .route("/user", get(get_user_bookings))
        .route("/instructor", get(get_instructor_bookings))
        .route("/:booking_id/status", put(update_booking_status))
        .route("/:booking_id", delete(cancel_booking))
        .route("/:booking_id/feedback", post(add_booking_feedback))
}
