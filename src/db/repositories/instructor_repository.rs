use sqlx::types::{Json, Uuid};
use sqlx::{Error, PgPool, Postgres, Transaction};

use crate::db::models::{DayAvailability, DayOfWeek, Instructor, WeeklyAvailability};

const INSTRUCTOR_COLUMNS: &str = "id, user_id, bio, expertise, hourly_rate, meeting_preference, \
     online_url, office_address, availability, is_active, total_bookings, completed_sessions, \
     rating, total_reviews, created_at, updated_at";

pub struct InstructorRepository;

impl InstructorRepository {
    pub async fn find_by_id(
        pool: &PgPool,
        instructor_id: Uuid,
    ) -> Result<Option<Instructor>, Error> {
        let sql = format!("SELECT {INSTRUCTOR_COLUMNS} FROM instructors WHERE id = $1");
        sqlx::query_as::<_, Instructor>(&sql)
            .bind(instructor_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Instructor>, Error> {
        let sql = format!("SELECT {INSTRUCTOR_COLUMNS} FROM instructors WHERE user_id = $1");
        sqlx::query_as::<_, Instructor>(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_availability(
        pool: &PgPool,
        instructor_id: Uuid,
    ) -> Result<Option<WeeklyAvailability>, Error> {
        let template = sqlx::query_scalar::<_, Json<WeeklyAvailability>>(
            "SELECT availability FROM instructors WHERE id = $1",
        )
        .bind(instructor_id)
        .fetch_optional(pool)
        .await?;
        Ok(template.map(|t| t.0))
    }

    /// Replace one day of the weekly template in place.
    pub async fn set_day_availability(
        pool: &PgPool,
        instructor_id: Uuid,
        day: DayOfWeek,
        schedule: &DayAvailability,
    ) -> Result<Option<Instructor>, Error> {
        let sql = format!(
            r#"
            UPDATE instructors
            SET availability = jsonb_set(availability, ARRAY[$2], $3::jsonb),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {INSTRUCTOR_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Instructor>(&sql)
            .bind(instructor_id)
            .bind(day.as_str())
            .bind(Json(schedule))
            .fetch_optional(pool)
            .await
    }

    pub async fn increment_total_bookings(
        tx: &mut Transaction<'_, Postgres>,
        instructor_id: Uuid,
    ) -> Result<(), Error> {
        sqlx::query(
            "UPDATE instructors SET total_bookings = total_bookings + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(instructor_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn increment_completed_sessions(
        tx: &mut Transaction<'_, Postgres>,
        instructor_id: Uuid,
    ) -> Result<(), Error> {
        sqlx::query(
            "UPDATE instructors SET completed_sessions = completed_sessions + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(instructor_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Overwrite the denormalized reputation cache after a feedback write.
    pub async fn update_reputation(
        pool: &PgPool,
        instructor_id: Uuid,
        rating: f64,
        total_reviews: i64,
    ) -> Result<(), Error> {
        sqlx::query(
            "UPDATE instructors SET rating = $2, total_reviews = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(instructor_id)
        .bind(rating)
        .bind(total_reviews as i32)
        .execute(pool)
        .await?;
        Ok(())
    }
}
