use sqlx::types::Uuid;
use sqlx::{Error, PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};

use crate::db::models::{Booking, BookingStatus, MeetingType, SessionType};

const BOOKING_COLUMNS: &str = "id, user_id, instructor_id, booking_date, start_time, end_time, \
     duration_minutes, session_type, subject, description, meeting_type, meeting_url, \
     meeting_location, status, amount, payment_status, payment_id, user_notes, \
     instructor_notes, admin_notes, confirmation_code, confirmed_at, cancelled_at, \
     cancellation_reason, user_rating, user_feedback, created_at, updated_at";

/// Name of the partial unique index guarding one live booking per
/// instructor/date/slot. Violations of this index are slot conflicts, not
/// generic duplicates.
pub const ACTIVE_SLOT_CONSTRAINT: &str = "bookings_active_slot_idx";

/// Insert payload assembled by the engine; derived fields (duration, amount,
/// meeting point, confirmation code) are already resolved.
#[derive(Debug)]
pub struct NewBookingRecord {
    pub user_id: Uuid,
    pub instructor_id: Uuid,
    pub booking_date: Date,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i32,
    pub session_type: SessionType,
    pub subject: String,
    pub description: String,
    pub meeting_type: MeetingType,
    pub meeting_url: String,
    pub meeting_location: String,
    pub amount: f64,
    pub user_notes: String,
    pub confirmation_code: String,
}

/// Field updates for one status transition. `confirmed_at`/`cancelled_at`
/// are stamped at most once: the update keeps an existing stamp.
#[derive(Debug, Default)]
pub struct StatusChange {
    pub status: Option<BookingStatus>,
    pub user_notes: Option<String>,
    pub instructor_notes: Option<String>,
    pub admin_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub confirmed_at: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
}

pub struct BookingRepository;

impl BookingRepository {
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        record: &NewBookingRecord,
    ) -> Result<Booking, Error> {
        let sql = format!(
            r#"
            INSERT INTO bookings (user_id, instructor_id, booking_date, start_time, end_time,
                duration_minutes, session_type, subject, description, meeting_type,
                meeting_url, meeting_location, amount, user_notes, confirmation_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Booking>(&sql)
            .bind(record.user_id)
            .bind(record.instructor_id)
            .bind(record.booking_date)
            .bind(&record.start_time)
            .bind(&record.end_time)
            .bind(record.duration_minutes)
            .bind(record.session_type)
            .bind(&record.subject)
            .bind(&record.description)
            .bind(record.meeting_type)
            .bind(&record.meeting_url)
            .bind(&record.meeting_location)
            .bind(record.amount)
            .bind(&record.user_notes)
            .bind(&record.confirmation_code)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, booking_id: Uuid) -> Result<Option<Booking>, Error> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, Booking>(&sql)
            .bind(booking_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_confirmation_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Booking>, Error> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE confirmation_code = $1");
        sqlx::query_as::<_, Booking>(&sql)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Pending/confirmed bookings for one instructor on one date — the set
    /// the slot resolver subtracts from the weekly template.
    pub async fn active_on_date(
        pool: &PgPool,
        instructor_id: Uuid,
        date: Date,
    ) -> Result<Vec<Booking>, Error> {
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE instructor_id = $1
              AND booking_date = $2
              AND status IN ('pending', 'confirmed')
            ORDER BY start_time
            "#
        );
        sqlx::query_as::<_, Booking>(&sql)
            .bind(instructor_id)
            .bind(date)
            .fetch_all(pool)
            .await
    }

    /// Pre-flight conflict probe for booking creation. The partial unique
    /// index remains the authoritative guard under concurrency.
    pub async fn slot_is_taken(
        pool: &PgPool,
        instructor_id: Uuid,
        date: Date,
        start_time: &str,
        end_time: &str,
    ) -> Result<bool, Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE instructor_id = $1
                  AND booking_date = $2
                  AND start_time = $3
                  AND end_time = $4
                  AND status IN ('pending', 'confirmed')
            )
            "#,
        )
        .bind(instructor_id)
        .bind(date)
        .bind(start_time)
        .bind(end_time)
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        status: Option<BookingStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Booking>, Error> {
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE user_id = $1
              AND ($2::booking_status IS NULL OR status = $2)
            ORDER BY booking_date DESC, start_time DESC
            LIMIT $3 OFFSET $4
            "#
        );
        sqlx::query_as::<_, Booking>(&sql)
            .bind(user_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_user(
        pool: &PgPool,
        user_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE user_id = $1
              AND ($2::booking_status IS NULL OR status = $2)
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(pool)
        .await
    }

    pub async fn list_for_instructor(
        pool: &PgPool,
        instructor_id: Uuid,
        status: Option<BookingStatus>,
        date: Option<Date>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Booking>, Error> {
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE instructor_id = $1
              AND ($2::booking_status IS NULL OR status = $2)
              AND ($3::date IS NULL OR booking_date = $3)
            ORDER BY booking_date ASC, start_time ASC
            LIMIT $4 OFFSET $5
            "#
        );
        sqlx::query_as::<_, Booking>(&sql)
            .bind(instructor_id)
            .bind(status)
            .bind(date)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count_for_instructor(
        pool: &PgPool,
        instructor_id: Uuid,
        status: Option<BookingStatus>,
        date: Option<Date>,
    ) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE instructor_id = $1
              AND ($2::booking_status IS NULL OR status = $2)
              AND ($3::date IS NULL OR booking_date = $3)
            "#,
        )
        .bind(instructor_id)
        .bind(status)
        .bind(date)
        .fetch_one(pool)
        .await
    }

    pub async fn apply_status_change(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        change: &StatusChange,
    ) -> Result<Booking, Error> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET
                status = COALESCE($2::booking_status, status),
                user_notes = COALESCE($3, user_notes),
                instructor_notes = COALESCE($4, instructor_notes),
                admin_notes = COALESCE($5, admin_notes),
                cancellation_reason = COALESCE($6, cancellation_reason),
                confirmed_at = COALESCE(confirmed_at, $7),
                cancelled_at = COALESCE(cancelled_at, $8),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Booking>(&sql)
            .bind(booking_id)
            .bind(change.status)
            .bind(change.user_notes.as_deref())
            .bind(change.instructor_notes.as_deref())
            .bind(change.admin_notes.as_deref())
            .bind(change.cancellation_reason.as_deref())
            .bind(change.confirmed_at)
            .bind(change.cancelled_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// One-time feedback write: the `user_rating IS NULL` guard makes the
    /// first writer win and any repeat attempt come back empty.
    pub async fn set_feedback(
        pool: &PgPool,
        booking_id: Uuid,
        rating: i16,
        feedback: Option<&str>,
    ) -> Result<Option<Booking>, Error> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET user_rating = $2, user_feedback = COALESCE($3, ''), updated_at = NOW()
            WHERE id = $1 AND user_rating IS NULL
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Booking>(&sql)
            .bind(booking_id)
            .bind(rating)
            .bind(feedback)
            .fetch_optional(pool)
            .await
    }

    /// Mean and count over every rated booking of one instructor. Source of
    /// truth for the denormalized reputation fields.
    pub async fn rating_summary(
        pool: &PgPool,
        instructor_id: Uuid,
    ) -> Result<(Option<f64>, i64), Error> {
        sqlx::query_as::<_, (Option<f64>, i64)>(
            r#"
            SELECT AVG(user_rating)::double precision, COUNT(*)
            FROM bookings
            WHERE instructor_id = $1 AND user_rating IS NOT NULL
            "#,
        )
        .bind(instructor_id)
        .fetch_one(pool)
        .await
    }
}
