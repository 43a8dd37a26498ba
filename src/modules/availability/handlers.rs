use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use sqlx::types::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{DayAvailability, DayOfWeek, UpdateDayAvailability};
use crate::db::{DatabaseError, InstructorRepository};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedActor;

pub async fn get_availability(
    State(state): State<AppState>,
    Path(instructor_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let template = InstructorRepository::get_availability(&state.db, instructor_id)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .ok_or_else(|| AppError::NotFound("Instructor not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "availability": template,
    })))
}

/// Replace one day of the weekly template. Only the owning instructor or an
/// admin may write; slot well-formedness beyond payload shape is the
/// author's responsibility.
pub async fn set_day_availability(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path((instructor_id, day)): Path<(Uuid, String)>,
    Json(payload): Json<UpdateDayAvailability>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;
    let day = day
        .parse::<DayOfWeek>()
        .map_err(AppError::BadRequest)?;

    let instructor = InstructorRepository::find_by_id(&state.db, instructor_id)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .ok_or_else(|| AppError::NotFound("Instructor not found".into()))?;

    if !actor.is_admin() && instructor.user_id != actor.user_id {
        return Err(AppError::Authorization(
            "Not authorized to edit this availability".into(),
        ));
    }

    let schedule = DayAvailability {
        available: payload.available,
        slots: payload.slots,
    };
    let updated =
        InstructorRepository::set_day_availability(&state.db, instructor_id, day, &schedule)
            .await
            .map_err(DatabaseError::from_sqlx)?
            .ok_or_else(|| AppError::NotFound("Instructor not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Availability updated for {}", day.as_str()),
        "availability": updated.availability,
    })))
}
