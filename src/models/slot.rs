use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A candidate appointment start time within a veterinarian's available
/// window. Transient, computed value — never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub free: bool,
    /// Present only when `free` is false, e.g. "occupied by appointment <id>".
    pub reason: Option<String>,
}

/// Availability for one veterinarian on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    /// False when the veterinarian has no active work window for the
    /// weekday — distinct from a fully booked day.
    pub has_schedule: bool,
    /// Ordered by start time ascending.
    pub slots: Vec<Slot>,
}

impl DayAvailability {
    pub fn no_schedule() -> Self {
        Self {
            has_schedule: false,
            slots: Vec::new(),
        }
    }

    /// Whether the given start time is offered and currently free.
    pub fn is_free(&self, time: NaiveTime) -> bool {
        self.slots.iter().any(|s| s.time == time && s.free)
    }
}
