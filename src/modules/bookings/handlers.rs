use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use sqlx::types::Uuid;
use time::Date;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{
    BookingFeedback, BookingStatus, CancelBooking, NewBooking, UpdateBookingStatus, UserRole,
};
use crate::db::{BookingRepository, DatabaseError, InstructorRepository};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedActor;

use super::slots;

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub instructor_id: Uuid,
    pub date: Date,
}

#[derive(Debug, Deserialize)]
pub struct UserBookingsQuery {
    pub status: Option<BookingStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct InstructorBookingsQuery {
    pub status: Option<BookingStatus>,
    pub date: Option<Date>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

struct Page {
    number: i64,
    limit: i64,
    offset: i64,
}

fn page_params(page: Option<u32>, limit: Option<u32>) -> Page {
    let number = i64::from(page.unwrap_or(1).max(1));
    let limit = i64::from(limit.unwrap_or(10).clamp(1, 100));
    Page {
        number,
        limit,
        offset: (number - 1) * limit,
    }
}

fn pagination_body(page: &Page, total: i64, returned: usize) -> serde_json::Value {
    let total_pages = (total + page.limit - 1) / page.limit;
    json!({
        "current_page": page.number,
        "total_pages": total_pages,
        "total_bookings": total,
        "has_next": page.offset + (returned as i64) < total,
        "has_prev": page.number > 1,
    })
}

pub async fn available_slots(
    State(state): State<AppState>,
    Query(query): Query<AvailableSlotsQuery>,
) -> AppResult<impl IntoResponse> {
    let day = slots::available_slots(&state.db, query.instructor_id, query.date).await?;

    Ok(Json(json!({
        "success": true,
        "available_slots": day.slots,
        "message": day.note,
    })))
}

pub async fn create_booking(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(payload): Json<NewBooking>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let booking = state.engine.create_booking(&actor, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Booking created successfully",
            "booking": booking,
        })),
    ))
}

pub async fn get_user_bookings(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Query(query): Query<UserBookingsQuery>,
) -> AppResult<impl IntoResponse> {
    let page = page_params(query.page, query.limit);

    let bookings = BookingRepository::list_for_user(
        &state.db,
        actor.user_id,
        query.status,
        page.limit,
        page.offset,
    )
    .await
    .map_err(DatabaseError::from_sqlx)?;
    let total = BookingRepository::count_for_user(&state.db, actor.user_id, query.status)
        .await
        .map_err(DatabaseError::from_sqlx)?;

    let pagination = pagination_body(&page, total, bookings.len());
    Ok(Json(json!({
        "success": true,
        "bookings": bookings,
        "pagination": pagination,
    })))
}

pub async fn get_instructor_bookings(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Query(query): Query<InstructorBookingsQuery>,
) -> AppResult<impl IntoResponse> {
    if actor.role != UserRole::Instructor {
        return Err(AppError::Authorization(
            "Access denied. Instructors only.".into(),
        ));
    }
    let instructor = InstructorRepository::find_by_user_id(&state.db, actor.user_id)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .ok_or_else(|| AppError::NotFound("Instructor profile not found".into()))?;

    let page = page_params(query.page, query.limit);

    let bookings = BookingRepository::list_for_instructor(
        &state.db,
        instructor.id,
        query.status,
        query.date,
        page.limit,
        page.offset,
    )
    .await
    .map_err(DatabaseError::from_sqlx)?;
    let total = BookingRepository::count_for_instructor(
        &state.db,
        instructor.id,
        query.status,
        query.date,
    )
    .await
    .map_err(DatabaseError::from_sqlx)?;

    let pagination = pagination_body(&page, total, bookings.len());
    Ok(Json(json!({
        "success": true,
        "bookings": bookings,
        "pagination": pagination,
    })))
}

pub async fn update_booking_status(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateBookingStatus>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let booking = state
        .engine
        .update_status(&actor, booking_id, payload)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Booking updated successfully",
        "booking": booking,
    })))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(booking_id): Path<Uuid>,
    payload: Option<Json<CancelBooking>>,
) -> AppResult<impl IntoResponse> {
    let reason = payload.and_then(|Json(body)| body.reason);

    let booking = state
        .engine
        .cancel_booking(&actor, booking_id, reason)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Booking cancelled successfully",
        "booking": booking,
    })))
}

pub async fn add_booking_feedback(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<BookingFeedback>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let booking = state.engine.add_feedback(&actor, booking_id, payload).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Feedback submitted successfully",
        "booking": booking,
    })))
}

/// Public lookup by confirmation code, the one identifier meant for sharing
/// outside an authenticated session.
pub async fn get_booking_by_confirmation(
    State(state): State<AppState>,
    Path(confirmation_code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let booking = BookingRepository::find_by_confirmation_code(&state.db, &confirmation_code)
        .await
        .map_err(DatabaseError::from_sqlx)?
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_default_and_clamp() {
        let page = page_params(None, None);
        assert_eq!((page.number, page.limit, page.offset), (1, 10, 0));

        let page = page_params(Some(3), Some(20));
        assert_eq!((page.number, page.limit, page.offset), (3, 20, 40));

        let page = page_params(Some(0), Some(10_000));
        assert_eq!((page.number, page.limit, page.offset), (1, 100, 0));
    }

    #[test]
    fn pagination_body_reports_bounds() {
        let page = page_params(Some(2), Some(10));
        let body = pagination_body(&page, 25, 10);

        assert_eq!(body["current_page"], 2);
        assert_eq!(body["total_pages"], 3);
        assert_eq!(body["total_bookings"], 25);
        assert_eq!(body["has_next"], true);
        assert_eq!(body["has_prev"], true);
    }
}
