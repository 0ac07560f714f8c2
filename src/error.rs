use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::AppointmentState;

/// Error taxonomy of the scheduling core.
///
/// Pure components (availability, lifecycle) only ever return typed errors;
/// callers decide retry policy per variant — none of these are retried
/// automatically by the core itself.
#[derive(Error, Debug)]
pub enum SchedulingError {
    /// Malformed input. Surfaced to the caller, not retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Veterinarian or service is disabled. Not retried.
    #[error("{resource} {id} is inactive")]
    ResourceInactive { resource: &'static str, id: Uuid },

    /// Requested slot is booked, outside the schedule, or lost to a
    /// concurrent reservation. The caller may retry with a different slot.
    #[error("Slot {time} on {date} is not available for veterinarian {veterinarian_id}")]
    SlotUnavailable {
        veterinarian_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    },

    /// Illegal lifecycle action for the appointment's current state.
    #[error("Invalid transition: cannot {action} an appointment in state {state}: {detail}")]
    InvalidTransition {
        action: &'static str,
        state: AppointmentState,
        detail: &'static str,
    },

    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    /// Communication permanently failed after its full attempt budget.
    /// Surfaced for operator attention, not retried further.
    #[error("Communication {0} has exhausted its delivery attempts")]
    DeliveryExhausted(Uuid),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Transport-level send failure reported by a `NotificationSender`.
/// Timeouts are reported here too and count toward the attempt budget.
#[derive(Error, Debug)]
#[error("Send failed: {0}")]
pub struct SendError(pub String);
