use axum::routing::{get, put};
use axum::Router;

use crate::app_state::AppState;

use super::handlers::{get_availability, set_day_availability};

pub fn availability_routes() -> Router<AppState> {
    Router::new()
        .route("/:instructor_id/availability", get(get_availability))
        .route("/:instructor_id/availability/:day", put(set_day_availability))
}
