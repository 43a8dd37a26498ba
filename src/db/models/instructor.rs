use serde::{Deserialize, Serialize};
use sqlx::types::{Json, Uuid};
use time::OffsetDateTime;

use super::availability::WeeklyAvailability;
use super::booking::MeetingType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "meeting_preference", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum MeetingPreference {
    Online,
    InPerson,
    Both,
}

/// Instructor profile: the Availability Store's weekly template plus the
/// commercial fields the Booking Engine reads (hourly rate, meeting
/// preference) and the counters/reputation fields it writes.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Instructor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: String,
    pub expertise: Vec<String>,
    pub hourly_rate: f64,
    pub meeting_preference: MeetingPreference,
    pub online_url: Option<String>,
    pub office_address: Option<String>,
    pub availability: Json<WeeklyAvailability>,
    pub is_active: bool,
    pub total_bookings: i32,
    pub completed_sessions: i32,
    pub rating: f64,
    pub total_reviews: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Instructor {
    /// Resolve the meeting type a session actually uses: the requested type
    /// when the instructor's preference allows it, the instructor's own
    /// preference otherwise. A `both` instructor with no request defaults to
    /// online.
    pub fn effective_meeting_type(&self, requested: Option<MeetingType>) -> MeetingType {
        match self.meeting_preference {
            MeetingPreference::Both => requested.unwrap_or(MeetingType::Online),
            MeetingPreference::Online => MeetingType::Online,
            MeetingPreference::InPerson => MeetingType::InPerson,
        }
    }

    /// Where the session happens, snapshotted onto the booking so later
    /// profile edits do not rewrite history.
    pub fn meeting_point(&self, meeting_type: MeetingType) -> (String, String) {
        match meeting_type {
            MeetingType::Online => (self.online_url.clone().unwrap_or_default(), String::new()),
            MeetingType::InPerson => {
                (String::new(), self.office_address.clone().unwrap_or_default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instructor(preference: MeetingPreference) -> Instructor {
        Instructor {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            bio: String::new(),
            expertise: vec![],
            hourly_rate: 200.0,
            meeting_preference: preference,
            online_url: Some("https://meet.example/room".into()),
            office_address: Some("12 College Lane".into()),
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
    fn requested_type_wins_when_preference_allows_it() {
        let i = instructor(MeetingPreference::Both);
        assert_eq!(
            i.effective_meeting_type(Some(MeetingType::InPerson)),
            MeetingType::InPerson
        );
        assert_eq!(
            i.effective_meeting_type(Some(MeetingType::Online)),
            MeetingType::Online
        );
    }

    #[test]
    fn incompatible_request_falls_back_to_instructor_preference() {
        let i = instructor(MeetingPreference::Online);
        assert_eq!(
            i.effective_meeting_type(Some(MeetingType::InPerson)),
            MeetingType::Online
        );

        let i = instructor(MeetingPreference::InPerson);
        assert_eq!(
            i.effective_meeting_type(Some(MeetingType::Online)),
            MeetingType::InPerson
        );
    }

    #[test]
    fn meeting_point_matches_effective_type() {
        let i = instructor(MeetingPreference::Both);

        let (url, location) = i.meeting_point(MeetingType::Online);
        assert_eq!(url, "https://meet.example/room");
        assert!(location.is_empty());

        let (url, location) = i.meeting_point(MeetingType::InPerson);
        assert!(url.is_empty());
        assert_eq!(location, "12 College Lane");
    }
}
