use std::collections::HashSet;

use serde::Serialize;
use sqlx::types::Uuid;
use sqlx::PgPool;
use time::Date;

use crate::db::models::TimeSlot;
use crate::db::{BookingRepository, InstructorRepository};

use super::error::BookingError;

/// Result of resolving one instructor-day. An unavailable day is a normal
/// empty answer with an explanatory note, not an error.
#[derive(Debug, Serialize)]
pub struct DaySlots {
    pub slots: Vec<TimeSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// Derive the open slots for an instructor on a calendar date: take the
/// weekly template entry for that weekday and subtract every slot consumed
/// by a pending/confirmed booking on that date.
///
/// Read-only and idempotent; safe to call concurrently. Bookings block a
/// template slot only on an exact (start, end) match.
pub async fn available_slots(
    pool: &PgPool,
    instructor_id: Uuid,
    date: Date,
) -> Result<DaySlots, BookingError> {
    let instructor = InstructorRepository::find_by_id(pool, instructor_id)
        .await?
        .ok_or(BookingError::InstructorNotFound)?;

    let day = instructor.availability.day(date.weekday()).clone();
    if !day.available || day.slots.is_empty() {
        return Ok(DaySlots {
            slots: Vec::new(),
            note: Some("Instructor is not available on this day"),
        });
    }

    let taken: HashSet<String> = BookingRepository::active_on_date(pool, instructor_id, date)
        .await?
        .iter()
        .map(|booking| booking.slot_key())
        .collect();

    Ok(DaySlots {
        slots: open_slots(&day.slots, &taken),
        note: None,
    })
}

/// Template slots not yet consumed, in template order.
fn open_slots(template: &[TimeSlot], taken: &HashSet<String>) -> Vec<TimeSlot> {
    template
        .iter()
        .filter(|slot| !taken.contains(&slot.key()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(start: &str, end: &str) -> TimeSlot {
        TimeSlot {
            start_time: start.into(),
            end_time: end.into(),
        }
    }

    #[test]
    fn taken_slots_are_excluded() {
        let template = vec![slot("09:00", "10:00"), slot("10:00", "11:00")];
        let taken: HashSet<String> = ["09:00-10:00".to_string()].into_iter().collect();

        let open = open_slots(&template, &taken);
        assert_eq!(open, vec![slot("10:00", "11:00")]);
    }

    #[test]
    fn template_order_is_preserved() {
        let template = vec![
            slot("14:00", "15:00"),
            slot("09:00", "10:00"),
            slot("16:00", "17:00"),
        ];
        let taken: HashSet<String> = ["09:00-10:00".to_string()].into_iter().collect();

        let open = open_slots(&template, &taken);
        assert_eq!(open, vec![slot("14:00", "15:00"), slot("16:00", "17:00")]);
    }

    #[test]
    fn partial_overlap_does_not_block_a_slot() {
        // Matching is by exact pair, not interval intersection.
        let template = vec![slot("09:00", "10:00")];
        let taken: HashSet<String> = ["09:15-09:45".to_string()].into_iter().collect();

        let open = open_slots(&template, &taken);
        assert_eq!(open, vec![slot("09:00", "10:00")]);
    }

    #[test]
    fn empty_taken_set_returns_full_template() {
        let template = vec![slot("09:00", "10:00"), slot("10:00", "11:00")];
        let open = open_slots(&template, &HashSet::new());
        assert_eq!(open.len(), 2);
    }
}
