//! Typed lifecycle events emitted by the coordinator.
//!
//! Emission is synchronous and ordered: subscribers observe events for a
//! given appointment in the order the coordinator applied them, and only
//! after the underlying write succeeded (persist-then-notify). No ordering
//! is guaranteed across different appointments.

use crate::models::{Appointment, AppointmentState};

#[derive(Debug, Clone)]
pub enum AppointmentEvent {
    Created(Appointment),
    StateChanged {
        appointment: Appointment,
        from: AppointmentState,
        to: AppointmentState,
    },
}

impl AppointmentEvent {
    pub fn appointment(&self) -> &Appointment {
        match self {
            Self::Created(appointment) => appointment,
            Self::StateChanged { appointment, .. } => appointment,
        }
    }
}

/// A synchronous event consumer (delivery ledger, audit trail, ...).
/// Implementations must not assume global ordering across appointments.
pub trait AppointmentEventSubscriber: Send + Sync {
    fn on_event(&self, event: &AppointmentEvent);
}
