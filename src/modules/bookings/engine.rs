use std::sync::Arc;

use sqlx::types::Uuid;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::warn;

use crate::clock::Clock;
use crate::db::models::{
    Booking, BookingFeedback, BookingStatus, Instructor, NewBooking, SessionType,
    UpdateBookingStatus, UserRole,
};
use crate::db::{
    BookingRepository, InstructorRepository, NewBookingRecord, StatusChange, UserRepository,
    ACTIVE_SLOT_CONSTRAINT,
};
use crate::middleware::auth::AuthenticatedActor;
use crate::notifications::{NotificationKind, NotificationPort, Recipient, RecipientRole};

use super::error::BookingError;

/// Orchestrates slot-conflict validation, fee computation, the booking
/// status lifecycle, and reputation aggregation. The only component that
/// enforces business invariants; everything else is reads and writes.
pub struct BookingEngine {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationPort>,
}

impl BookingEngine {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, notifier: Arc<dyn NotificationPort>) -> Self {
        Self {
            pool,
            clock,
            notifier,
        }
    }

    /// Create a booking for the acting student.
    ///
    /// The slot check runs twice: a friendly pre-check against the live
    /// bookings, then the partial unique index at insert time, which is the
    /// guard that actually holds under concurrent submissions. Duration and
    /// amount are derived server-side; client-supplied price fields are
    /// never trusted.
    pub async fn create_booking(
        &self,
        actor: &AuthenticatedActor,
        request: NewBooking,
    ) -> Result<Booking, BookingError> {
        let instructor = InstructorRepository::find_by_id(&self.pool, request.instructor_id)
            .await?
            .ok_or(BookingError::InstructorNotFound)?;

        let duration_minutes =
            crate::db::models::session_minutes(&request.start_time, &request.end_time).ok_or_else(
                || {
                    BookingError::InvalidTime(format!(
                        "{}-{} is not a valid session window",
                        request.start_time, request.end_time
                    ))
                },
            )?;

        if BookingRepository::slot_is_taken(
            &self.pool,
            instructor.id,
            request.booking_date,
            &request.start_time,
            &request.end_time,
        )
        .await?
        {
            return Err(BookingError::SlotUnavailable);
        }

        let meeting_type = instructor.effective_meeting_type(request.meeting_type);
        let (meeting_url, meeting_location) = instructor.meeting_point(meeting_type);

        let record = NewBookingRecord {
            user_id: actor.user_id,
            instructor_id: instructor.id,
            booking_date: request.booking_date,
            start_time: request.start_time,
            end_time: request.end_time,
            duration_minutes,
            session_type: request.session_type.unwrap_or(SessionType::Consultation),
            subject: request.subject.unwrap_or_default(),
            description: request.description.unwrap_or_default(),
            meeting_type,
            meeting_url,
            meeting_location,
            amount: session_amount(duration_minutes, instructor.hourly_rate),
            user_notes: request.user_notes.unwrap_or_default(),
            confirmation_code: confirmation_code(self.clock.now_utc()),
        };

        // Insert and counter increment form one atomic unit.
        let mut tx = self.pool.begin().await.map_err(BookingError::from)?;
        let booking = match BookingRepository::create(&mut tx, &record).await {
            Ok(booking) => booking,
            Err(err) if is_slot_conflict(&err) => return Err(BookingError::SlotUnavailable),
            Err(err) => return Err(err.into()),
        };
        InstructorRepository::increment_total_bookings(&mut tx, instructor.id).await?;
        tx.commit().await.map_err(BookingError::from)?;

        self.dispatch(NotificationKind::Confirmation, booking.clone());
        Ok(booking)
    }

    /// Apply one status transition on behalf of an actor.
    ///
    /// A request for the current status is a no-op. Cancellation by a
    /// non-admin must clear the 24-hour window; an admin bypasses the window
    /// but never the terminal-state rule.
    pub async fn update_status(
        &self,
        actor: &AuthenticatedActor,
        booking_id: Uuid,
        request: UpdateBookingStatus,
    ) -> Result<Booking, BookingError> {
        let booking = BookingRepository::find_by_id(&self.pool, booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;
        let instructor = InstructorRepository::find_by_id(&self.pool, booking.instructor_id)
            .await?
            .ok_or(BookingError::InstructorNotFound)?;

        if !is_authorized(actor, &booking, &instructor) {
            return Err(BookingError::Forbidden);
        }

        if request.status == booking.status {
            return Ok(booking);
        }

        if !booking.status.can_transition_to(request.status) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: request.status,
            });
        }

        let now = self.clock.now_utc();
        if request.status == BookingStatus::Cancelled
            && actor.role != UserRole::Admin
            && !booking.can_be_cancelled(now)
        {
            return Err(BookingError::CancellationWindowClosed);
        }

        let (user_notes, instructor_notes, admin_notes) = route_notes(actor.role, request.notes);
        let change = StatusChange {
            status: Some(request.status),
            user_notes,
            instructor_notes,
            admin_notes,
            cancellation_reason: (request.status == BookingStatus::Cancelled)
                .then(|| request.cancellation_reason.unwrap_or_default()),
            confirmed_at: (request.status == BookingStatus::Confirmed).then_some(now),
            cancelled_at: (request.status == BookingStatus::Cancelled).then_some(now),
        };

        let mut tx = self.pool.begin().await.map_err(BookingError::from)?;
        let updated = BookingRepository::apply_status_change(&mut tx, booking.id, &change).await?;
        if request.status == BookingStatus::Completed {
            InstructorRepository::increment_completed_sessions(&mut tx, instructor.id).await?;
        }
        tx.commit().await.map_err(BookingError::from)?;

        self.dispatch(NotificationKind::StatusUpdate, updated.clone());
        Ok(updated)
    }

    /// Cancel a booking; sugar over a `cancelled` status transition.
    pub async fn cancel_booking(
        &self,
        actor: &AuthenticatedActor,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> Result<Booking, BookingError> {
        self.update_status(
            actor,
            booking_id,
            UpdateBookingStatus {
                status: BookingStatus::Cancelled,
                notes: None,
                cancellation_reason: reason,
            },
        )
        .await
    }

    /// Attach one-time feedback to a completed booking and refresh the
    /// instructor's reputation aggregate.
    pub async fn add_feedback(
        &self,
        actor: &AuthenticatedActor,
        booking_id: Uuid,
        request: BookingFeedback,
    ) -> Result<Booking, BookingError> {
        let booking = BookingRepository::find_by_id(&self.pool, booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if booking.user_id != actor.user_id {
            return Err(BookingError::Forbidden);
        }
        if booking.status != BookingStatus::Completed {
            return Err(BookingError::InvalidState);
        }
        if booking.user_rating.is_some() {
            return Err(BookingError::AlreadyRated);
        }

        // The guarded update keeps feedback one-time even when two requests
        // race past the check above: the second writer matches no row.
        let updated = BookingRepository::set_feedback(
            &self.pool,
            booking.id,
            request.rating,
            request.feedback.as_deref(),
        )
        .await?
        .ok_or(BookingError::AlreadyRated)?;

        self.recompute_reputation(booking.instructor_id).await?;
        Ok(updated)
    }

    /// Full recomputation over every rated booking. Runs after the feedback
    /// write commits so it never holds up booking creation.
    async fn recompute_reputation(&self, instructor_id: Uuid) -> Result<(), BookingError> {
        let (average, total) = BookingRepository::rating_summary(&self.pool, instructor_id).await?;
        if let Some(average) = average {
            InstructorRepository::update_reputation(
                &self.pool,
                instructor_id,
                round_to_tenth(average),
                total,
            )
            .await?;
        }
        Ok(())
    }

    /// Fire-and-forget notification dispatch. Runs out-of-band; failures are
    /// logged and never propagate into the booking operation.
    fn dispatch(&self, kind: NotificationKind, booking: Booking) {
        let pool = self.pool.clone();
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(err) = deliver_to_parties(&pool, notifier.as_ref(), kind, &booking).await {
                warn!(
                    booking_id = %booking.id,
                    error = %err,
                    "Notification dispatch failed"
                );
            }
        });
    }
}

async fn deliver_to_parties(
    pool: &PgPool,
    notifier: &dyn NotificationPort,
    kind: NotificationKind,
    booking: &Booking,
) -> anyhow::Result<()> {
    let mut recipients = Vec::new();

    if let Some(student) = UserRepository::find_by_id(pool, booking.user_id).await? {
        recipients.push(Recipient {
            name: student.name,
            email: student.email,
            role: RecipientRole::Student,
        });
    }
    if let Some(instructor) = InstructorRepository::find_by_id(pool, booking.instructor_id).await? {
        if let Some(instructor_user) = UserRepository::find_by_id(pool, instructor.user_id).await? {
            recipients.push(Recipient {
                name: instructor_user.name,
                email: instructor_user.email,
                role: RecipientRole::Instructor,
            });
        }
    }

    for recipient in &recipients {
        if let Err(err) = notifier.notify(kind, booking, recipient).await {
            warn!(
                booking_id = %booking.id,
                recipient = %recipient.email,
                error = %err,
                "Failed to deliver booking notification"
            );
        }
    }
    Ok(())
}

/// Session fee: hourly rate prorated over the derived duration.
fn session_amount(duration_minutes: i32, hourly_rate: f64) -> f64 {
    (duration_minutes as f64 / 60.0) * hourly_rate
}

/// Reputation is displayed with one decimal; round once, at the aggregate.
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Human-shareable confirmation code, unique by construction (millisecond
/// timestamp plus random suffix) and backed by a unique index.
fn confirmation_code(now: OffsetDateTime) -> String {
    use rand::Rng;
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("BK{}{:03}", millis, suffix)
}

/// Mutation rights: the booking's student, the instructor behind the
/// booking's profile, or an admin.
fn is_authorized(actor: &AuthenticatedActor, booking: &Booking, instructor: &Instructor) -> bool {
    actor.role == UserRole::Admin
        || booking.user_id == actor.user_id
        || (actor.role == UserRole::Instructor && instructor.user_id == actor.user_id)
}

/// Notes land in the field matching the actor's role, never a shared one.
fn route_notes(
    role: UserRole,
    notes: Option<String>,
) -> (Option<String>, Option<String>, Option<String>) {
    match role {
        UserRole::Student => (notes, None, None),
        UserRole::Instructor => (None, notes, None),
        UserRole::Admin => (None, None, notes),
    }
}

fn is_slot_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation() && db.constraint() == Some(ACTIVE_SLOT_CONSTRAINT))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{MeetingPreference, MeetingType, PaymentStatus, WeeklyAvailability};
    use sqlx::types::Json;
    use time::macros::{date, datetime};

    #[test]
    fn fee_is_rate_prorated_by_duration() {
        // 90 minutes against a 200/hour rate is always 300, no matter what
        // the client claims.
        assert_eq!(session_amount(90, 200.0), 300.0);
        assert_eq!(session_amount(60, 150.0), 150.0);
        assert_eq!(session_amount(30, 100.0), 50.0);
    }

    #[test]
    fn reputation_rounds_to_one_decimal() {
        // 5, 4, 3 -> mean 4.0
        assert_eq!(round_to_tenth((5.0 + 4.0 + 3.0) / 3.0), 4.0);
        // 5, 4 -> 4.5
        assert_eq!(round_to_tenth(4.5), 4.5);
        // 5, 5, 4 -> 4.666... -> 4.7
        assert_eq!(round_to_tenth(14.0 / 3.0), 4.7);
    }

    #[test]
    fn notes_route_to_the_actor_role_field() {
        let notes = Some("running late".to_string());

        assert_eq!(
            route_notes(UserRole::Student, notes.clone()),
            (notes.clone(), None, None)
        );
        assert_eq!(
            route_notes(UserRole::Instructor, notes.clone()),
            (None, notes.clone(), None)
        );
        assert_eq!(
            route_notes(UserRole::Admin, notes.clone()),
            (None, None, notes)
        );
    }

    #[test]
    fn confirmation_codes_carry_prefix_and_timestamp() {
        let code = confirmation_code(datetime!(2024-06-01 12:00 UTC));
        assert!(code.starts_with("BK"));
        // Millisecond timestamp plus three random digits.
        assert_eq!(code.len(), "BK".len() + 13 + 3);
    }

    fn booking_for(user_id: Uuid, instructor_id: Uuid) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id,
            instructor_id,
            booking_date: date!(2024 - 06 - 10),
            start_time: "10:00".into(),
            end_time: "11:00".into(),
            duration_minutes: 60,
            session_type: SessionType::Consultation,
            subject: String::new(),
            description: String::new(),
            meeting_type: MeetingType::Online,
            meeting_url: String::new(),
            meeting_location: String::new(),
            status: BookingStatus::Pending,
            amount: 100.0,
            payment_status: PaymentStatus::Pending,
            payment_id: String::new(),
            user_notes: String::new(),
            instructor_notes: String::new(),
            admin_notes: String::new(),
            confirmation_code: "BK1".into(),
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: String::new(),
            user_rating: None,
            user_feedback: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn instructor_owned_by(user_id: Uuid) -> Instructor {
        Instructor {
            id: Uuid::new_v4(),
            user_id,
            bio: String::new(),
            expertise: vec![],
            hourly_rate: 100.0,
            meeting_preference: MeetingPreference::Online,
            online_url: None,
            office_address: None,
            availability: Json(WeeklyAvailability::default()),
            is_active: true,
            total_bookings: 0,
            completed_sessions: 0,
            rating: 0.0,
            total_reviews: 0,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn only_parties_and_admins_may_mutate() {
        let student_id = Uuid::new_v4();
        let instructor_user_id = Uuid::new_v4();
        let booking = booking_for(student_id, Uuid::new_v4());
        let instructor = instructor_owned_by(instructor_user_id);

        let owner = AuthenticatedActor {
            user_id: student_id,
            role: UserRole::Student,
        };
        let provider = AuthenticatedActor {
            user_id: instructor_user_id,
            role: UserRole::Instructor,
        };
        let admin = AuthenticatedActor {
            user_id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        let stranger = AuthenticatedActor {
            user_id: Uuid::new_v4(),
            role: UserRole::Student,
        };
        let other_instructor = AuthenticatedActor {
            user_id: Uuid::new_v4(),
            role: UserRole::Instructor,
        };

        assert!(is_authorized(&owner, &booking, &instructor));
        assert!(is_authorized(&provider, &booking, &instructor));
        assert!(is_authorized(&admin, &booking, &instructor));
        assert!(!is_authorized(&stranger, &booking, &instructor));
        assert!(!is_authorized(&other_instructor, &booking, &instructor));
    }
}
