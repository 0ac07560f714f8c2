use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentState;

/// A booked visit. Owned exclusively by the coordinator; mutated only
/// through state-machine-approved transitions. Never deleted — terminal
/// states are `Attended` and `Cancelled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub veterinarian_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    /// Derived from the service at booking time.
    pub duration_minutes: u32,
    pub state: AppointmentState,
    pub is_emergency: bool,
    pub quoted_fee: f64,
    pub created_at: NaiveDateTime,
    pub confirmed_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub cancellation_reason: Option<String>,
    pub attendance_started_at: Option<NaiveDateTime>,
    pub attendance_ended_at: Option<NaiveDateTime>,
}

impl Appointment {
    /// Booking start as seconds from midnight.
    pub fn start_second(&self) -> u32 {
        self.start_time.num_seconds_from_midnight()
    }

    /// Booking end as seconds from midnight. Exceeds 86400 for a booking
    /// that runs past midnight; `NaiveTime` arithmetic would wrap instead.
    pub fn end_second(&self) -> u32 {
        self.start_second() + self.duration_minutes * 60
    }

    pub fn start_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// Whether the half-open interval `[start_second, end_second)` of the
    /// same day intersects the booking.
    pub fn overlaps(&self, start_second: u32, end_second: u32) -> bool {
        self.start_second() < end_second && start_second < self.end_second()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample() -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            veterinarian_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            duration_minutes: 30,
            state: AppointmentState::Scheduled,
            is_emergency: false,
            quoted_fee: 40.0,
            created_at: NaiveDateTime::from_str("2026-08-20T09:00:00").unwrap(),
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            attendance_started_at: None,
            attendance_ended_at: None,
        }
    }

    fn s(h: u32, m: u32) -> u32 {
        (h * 60 + m) * 60
    }

    #[test]
    fn end_second_adds_duration() {
        let apt = sample();
        assert_eq!(apt.start_second(), s(10, 0));
        assert_eq!(apt.end_second(), s(10, 30));
    }

    #[test]
    fn overlap_is_half_open() {
        let apt = sample();
        assert!(apt.overlaps(s(10, 0), s(10, 30)));
        assert!(apt.overlaps(s(9, 45), s(10, 15)));
        assert!(apt.overlaps(s(10, 15), s(10, 45)));
        // Adjacent intervals do not overlap
        assert!(!apt.overlaps(s(9, 30), s(10, 0)));
        assert!(!apt.overlaps(s(10, 30), s(11, 0)));
    }

    #[test]
    fn booking_past_midnight_does_not_wrap() {
        let mut apt = sample();
        apt.start_time = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        apt.duration_minutes = 120;

        // End stays past the day boundary instead of wrapping to 01:00.
        assert_eq!(apt.end_second(), 25 * 3600);
        assert!(apt.overlaps(s(23, 30), 24 * 3600));
        assert!(!apt.overlaps(s(22, 0), s(23, 0)));
    }
}
