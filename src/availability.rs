//! Availability computation — pure function from (work windows, existing
//! bookings, service duration) to an ordered list of free/occupied slots.
//!
//! Read-only and side-effect-free. Race-free booking is the coordinator's
//! contract, not this module's: two concurrent callers may both observe a
//! slot as free here.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike};

use crate::models::{Appointment, DayAvailability, Slot, WorkWindow};

/// Compute the slot grid for one veterinarian on one date.
///
/// Work windows are filtered to the date's weekday and `active = true`,
/// merged into disjoint maximal intervals, then walked in steps of the
/// service duration. A candidate intersecting any non-cancelled appointment
/// is marked occupied with the appointment id as reason. No active window
/// for the weekday yields `has_schedule = false` with an empty slot list —
/// that is an answer, not an error.
pub fn compute_availability(
    date: NaiveDate,
    service_duration_minutes: u32,
    work_windows: &[WorkWindow],
    existing_appointments: &[Appointment],
) -> DayAvailability {
    let weekday = date.weekday();
    let day_windows: Vec<&WorkWindow> = work_windows
        .iter()
        .filter(|w| w.active && w.weekday == weekday)
        .collect();

    if day_windows.is_empty() {
        return DayAvailability::no_schedule();
    }

    let merged = merge_windows(&day_windows);
    let step_seconds = service_duration_minutes * 60;
    let step = Duration::minutes(service_duration_minutes as i64);

    let mut slots = Vec::new();
    for (window_start, window_end) in merged {
        // Walk in seconds from midnight: a candidate end computed in
        // `NaiveTime` would wrap at 24:00 and never pass the window end,
        // looping forever when the remaining span is shorter than one slot.
        let end_second = window_end.num_seconds_from_midnight();
        let mut time = window_start;
        let mut second = window_start.num_seconds_from_midnight();
        // No partial trailing slot: the candidate must fit entirely.
        while second + step_seconds <= end_second {
            let slot_end = second + step_seconds;
            let occupied_by = existing_appointments
                .iter()
                .filter(|a| !matches!(a.state, crate::models::AppointmentState::Cancelled))
                .find(|a| a.overlaps(second, slot_end));
            slots.push(match occupied_by {
                Some(apt) => Slot {
                    time,
                    duration_minutes: service_duration_minutes,
                    free: false,
                    reason: Some(format!("occupied by appointment {}", apt.id)),
                },
                None => Slot {
                    time,
                    duration_minutes: service_duration_minutes,
                    free: true,
                    reason: None,
                },
            });
            second = slot_end;
            time += step;
        }
    }

    // Starts are unique per merged interval by construction; sorting keeps
    // the ascending order across intervals.
    slots.sort_by_key(|s| s.time);

    DayAvailability {
        has_schedule: true,
        slots,
    }
}

/// Merge overlapping or adjacent windows into disjoint maximal intervals,
/// sorted by start time. Windows are not assumed disjoint.
fn merge_windows(windows: &[&WorkWindow]) -> Vec<(NaiveTime, NaiveTime)> {
    let mut intervals: Vec<(NaiveTime, NaiveTime)> = windows
        .iter()
        .filter(|w| w.start_time < w.end_time)
        .map(|w| (w.start_time, w.end_time))
        .collect();
    intervals.sort();

    let mut merged: Vec<(NaiveTime, NaiveTime)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            // Adjacent windows (prev_end == start) merge too
            Some((_, prev_end)) if start <= *prev_end => {
                if end > *prev_end {
                    *prev_end = end;
                }
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}
