use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recurring weekly interval during which a veterinarian accepts
/// appointments. Multiple windows per weekday are allowed and may overlap;
/// availability computation merges them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkWindow {
    pub id: Uuid,
    pub veterinarian_id: Uuid,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub active: bool,
}

impl WorkWindow {
    pub fn new(
        veterinarian_id: Uuid,
        weekday: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            veterinarian_id,
            weekday,
            start_time,
            end_time,
            active: true,
        }
    }
}
