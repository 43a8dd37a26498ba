use serde::{Deserialize, Serialize};
use time::Weekday;
use validator::Validate;

/// One bookable window in an instructor's weekly template. Times are
/// instructor-local wall clock in "HH:MM" form, no timezone attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: String,
    pub end_time: String,
}

impl TimeSlot {
    /// Key used to match a template slot against an existing booking.
    /// Slots are compared by exact (start, end) pair, not interval overlap.
    pub fn key(&self) -> String {
        slot_key(&self.start_time, &self.end_time)
    }
}

pub fn slot_key(start_time: &str, end_time: &str) -> String {
    format!("{}-{}", start_time, end_time)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayAvailability {
    pub available: bool,
    pub slots: Vec<TimeSlot>,
}

/// Recurring weekly template, one entry per day. Days an instructor never
/// touched deserialize to the default (unavailable, no slots), so a fresh
/// profile exposes nothing bookable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyAvailability {
    pub monday: DayAvailability,
    pub tuesday: DayAvailability,
    pub wednesday: DayAvailability,
    pub thursday: DayAvailability,
    pub friday: DayAvailability,
    pub saturday: DayAvailability,
    pub sunday: DayAvailability,
}

impl WeeklyAvailability {
    pub fn day(&self, weekday: Weekday) -> &DayAvailability {
        match weekday {
            Weekday::Monday => &self.monday,
            Weekday::Tuesday => &self.tuesday,
            Weekday::Wednesday => &self.wednesday,
            Weekday::Thursday => &self.thursday,
            Weekday::Friday => &self.friday,
            Weekday::Saturday => &self.saturday,
            Weekday::Sunday => &self.sunday,
        }
    }

}

/// Day name as it appears in the template JSON and in availability URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl std::str::FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monday" => Ok(DayOfWeek::Monday),
            "tuesday" => Ok(DayOfWeek::Tuesday),
            "wednesday" => Ok(DayOfWeek::Wednesday),
            "thursday" => Ok(DayOfWeek::Thursday),
            "friday" => Ok(DayOfWeek::Friday),
            "saturday" => Ok(DayOfWeek::Saturday),
            "sunday" => Ok(DayOfWeek::Sunday),
            _ => Err(format!("Unknown day of week: {}", s)),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDayAvailability {
    pub available: bool,
    #[validate(length(max = 48))]
    pub slots: Vec<TimeSlot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_days_deserialize_as_unavailable() {
        let weekly: WeeklyAvailability = serde_json::from_str(
            r#"{"monday": {"available": true, "slots": [{"start_time": "09:00", "end_time": "10:00"}]}}"#,
        )
        .unwrap();

        assert!(weekly.monday.available);
        assert_eq!(weekly.monday.slots.len(), 1);
        assert!(!weekly.tuesday.available);
        assert!(weekly.tuesday.slots.is_empty());
        assert!(!weekly.sunday.available);
    }

    #[test]
    fn day_lookup_follows_calendar_weekday() {
        let mut weekly = WeeklyAvailability::default();
        weekly.wednesday.available = true;

        assert!(weekly.day(Weekday::Wednesday).available);
        assert!(!weekly.day(Weekday::Thursday).available);
    }

    #[test]
    fn slot_key_is_exact_pair() {
        let slot = TimeSlot {
            start_time: "09:00".into(),
            end_time: "10:00".into(),
        };
        assert_eq!(slot.key(), "09:00-10:00");
    }
}
