use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::macros::format_description;
use time::{format_description::FormatItem, Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl BookingStatus {
    /// Terminal statuses admit no further transition; a completed booking
    /// may still receive one-time feedback, which is not a status change.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Completed | BookingStatus::NoShow
        )
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Pending, BookingStatus::NoShow)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::NoShow)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::NoShow => "no-show",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "session_type", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    Consultation,
    Tutoring,
    ExamPrep,
    CareerGuidance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "meeting_type", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum MeetingType {
    Online,
    InPerson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

const HHMM: &[FormatItem<'static>] = format_description!("[hour]:[minute]");

/// Parse a wall-clock "HH:MM" string as stored on bookings and templates.
pub fn parse_hhmm(value: &str) -> Result<Time, time::error::Parse> {
    Time::parse(value, HHMM)
}

/// Minutes between two "HH:MM" strings, `None` when either fails to parse
/// or the window is not strictly positive.
pub fn session_minutes(start_time: &str, end_time: &str) -> Option<i32> {
    let start = parse_hhmm(start_time).ok()?;
    let end = parse_hhmm(end_time).ok()?;
    let minutes = (end - start).whole_minutes();
    (minutes > 0).then_some(minutes as i32)
}

/// One reservation attempt. Rows are never deleted: cancellation is a status,
/// and history feeds the instructor's reputation aggregate.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
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

    pub status: BookingStatus,

    pub amount: f64,
    pub payment_status: PaymentStatus,
    pub payment_id: String,

    pub user_notes: String,
    pub instructor_notes: String,
    pub admin_notes: String,

    pub confirmation_code: String,
    pub confirmed_at: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub cancellation_reason: String,

    pub user_rating: Option<i16>,
    pub user_feedback: String,

    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Booking {
    /// Session start as an instant, assuming the stored wall clock is UTC.
    pub fn starts_at(&self) -> Option<OffsetDateTime> {
        let start = parse_hhmm(&self.start_time).ok()?;
        Some(PrimitiveDateTime::new(self.booking_date, start).assume_utc())
    }

    pub fn slot_key(&self) -> String {
        super::availability::slot_key(&self.start_time, &self.end_time)
    }

    /// Cancellation policy: live statuses only, and the session must start
    /// more than 24 hours after `now`. Evaluated fresh on every call; the
    /// answer flips as the deadline approaches, so callers must not cache it.
    pub fn can_be_cancelled(&self, now: OffsetDateTime) -> bool {
        if !matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed) {
            return false;
        }
        match self.starts_at() {
            Some(start) => start - now > Duration::hours(24),
            None => false,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewBooking {
    pub instructor_id: Uuid,
    pub booking_date: Date,
    #[validate(length(min = 4, max = 5))]
    pub start_time: String,
    #[validate(length(min = 4, max = 5))]
    pub end_time: String,
    pub session_type: Option<SessionType>,
    pub meeting_type: Option<MeetingType>,
    #[validate(length(max = 255))]
    pub subject: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2000))]
    pub user_notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookingStatus {
    pub status: BookingStatus,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 1000))]
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelBooking {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BookingFeedback {
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(max = 1000))]
    pub feedback: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn booking(status: BookingStatus, booking_date: Date, start_time: &str) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            booking_date,
            start_time: start_time.to_string(),
            end_time: "11:00".to_string(),
            duration_minutes: 60,
            session_type: SessionType::Consultation,
            subject: String::new(),
            description: String::new(),
            meeting_type: MeetingType::Online,
            meeting_url: String::new(),
            meeting_location: String::new(),
            status,
            amount: 100.0,
            payment_status: PaymentStatus::Pending,
            payment_id: String::new(),
            user_notes: String::new(),
            instructor_notes: String::new(),
            admin_notes: String::new(),
            confirmation_code: "BK1700000000000042".to_string(),
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: String::new(),
            user_rating: None,
            user_feedback: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn lifecycle_transitions() {
        use BookingStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(NoShow));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(NoShow));

        // Completion requires confirmation first.
        assert!(!Pending.can_transition_to(Completed));

        for terminal in [Cancelled, Completed, NoShow] {
            assert!(terminal.is_terminal());
            for next in [Pending, Confirmed, Cancelled, Completed, NoShow] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn session_minutes_requires_positive_window() {
        assert_eq!(session_minutes("09:00", "10:30"), Some(90));
        assert_eq!(session_minutes("09:00", "09:00"), None);
        assert_eq!(session_minutes("10:00", "09:00"), None);
        assert_eq!(session_minutes("not-a-time", "10:00"), None);
    }

    #[test]
    fn cancellation_window_is_24_hours_before_start() {
        use crate::clock::{test_support::FixedClock, Clock};

        let b = booking(BookingStatus::Confirmed, date!(2024 - 06 - 10), "10:00");

        // 48 hours out: cancellable.
        let clock = FixedClock(datetime!(2024-06-08 10:00 UTC));
        assert!(b.can_be_cancelled(clock.now_utc()));
        // 10 hours out: the window has closed.
        let clock = FixedClock(datetime!(2024-06-10 00:00 UTC));
        assert!(!b.can_be_cancelled(clock.now_utc()));
        // Exactly 24 hours out is already too late.
        let clock = FixedClock(datetime!(2024-06-09 10:00 UTC));
        assert!(!b.can_be_cancelled(clock.now_utc()));
    }

    #[test]
    fn cancellation_requires_live_status() {
        let far_future = date!(2030 - 01 - 01);
        let now = datetime!(2024-06-01 00:00 UTC);

        assert!(booking(BookingStatus::Pending, far_future, "10:00").can_be_cancelled(now));
        assert!(booking(BookingStatus::Confirmed, far_future, "10:00").can_be_cancelled(now));
        assert!(!booking(BookingStatus::Completed, far_future, "10:00").can_be_cancelled(now));
        assert!(!booking(BookingStatus::Cancelled, far_future, "10:00").can_be_cancelled(now));
        assert!(!booking(BookingStatus::NoShow, far_future, "10:00").can_be_cancelled(now));
    }

    #[test]
    fn status_wire_format_uses_kebab_case() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::NoShow).unwrap(),
            "\"no-show\""
        );
        assert_eq!(
            serde_json::to_string(&SessionType::ExamPrep).unwrap(),
            "\"exam-prep\""
        );
        assert_eq!(
            serde_json::to_string(&MeetingType::InPerson).unwrap(),
            "\"in-person\""
        );
    }
}
