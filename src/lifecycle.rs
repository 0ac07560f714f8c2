//! Appointment lifecycle — a pure transition table over the four states.
//!
//! `apply` never performs I/O: it maps (appointment, action, now) to either
//! a [`TransitionOutcome`] describing the new state and the field writes, or
//! an `InvalidTransition` error. The coordinator owns persisting the outcome.

use chrono::NaiveDateTime;
use tracing::warn;

use crate::error::SchedulingError;
use crate::models::{Appointment, AppointmentState};

/// A caller-requested lifecycle action.
#[derive(Debug, Clone)]
pub enum LifecycleAction {
    Confirm,
    Cancel { reason: String },
    Attend,
}

impl LifecycleAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel { .. } => "cancel",
            Self::Attend => "attend",
        }
    }
}

/// Field writes an accepted transition performs.
#[derive(Debug, Clone, PartialEq)]
pub enum StateMutation {
    /// Idempotent repeat of an already-applied action; nothing to persist.
    None,
    Confirmed { at: NaiveDateTime },
    Cancelled { at: NaiveDateTime, reason: String },
    AttendanceStarted { at: NaiveDateTime },
    AttendanceEnded { at: NaiveDateTime },
}

/// Result of a legal transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub new_state: AppointmentState,
    pub mutation: StateMutation,
}

impl TransitionOutcome {
    /// Whether the appointment record changed at all (state or fields).
    pub fn is_noop(&self) -> bool {
        self.mutation == StateMutation::None
    }

    /// Write the outcome into an appointment value.
    pub fn apply_to(&self, appointment: &mut Appointment) {
        appointment.state = self.new_state;
        match &self.mutation {
            StateMutation::None => {}
            StateMutation::Confirmed { at } => appointment.confirmed_at = Some(*at),
            StateMutation::Cancelled { at, reason } => {
                appointment.cancelled_at = Some(*at);
                appointment.cancellation_reason = Some(reason.clone());
            }
            StateMutation::AttendanceStarted { at } => {
                appointment.attendance_started_at = Some(*at)
            }
            StateMutation::AttendanceEnded { at } => appointment.attendance_ended_at = Some(*at),
        }
    }
}

/// Evaluate one lifecycle action against the transition table.
pub fn apply(
    appointment: &Appointment,
    action: &LifecycleAction,
    now: NaiveDateTime,
) -> Result<TransitionOutcome, SchedulingError> {
    use AppointmentState::*;
    use LifecycleAction::*;

    match (appointment.state, action) {
        (Scheduled, Confirm) => Ok(TransitionOutcome {
            new_state: Confirmed,
            mutation: StateMutation::Confirmed { at: now },
        }),
        (Scheduled, Cancel { reason }) | (Confirmed, Cancel { reason }) => {
            Ok(TransitionOutcome {
                new_state: Cancelled,
                mutation: StateMutation::Cancelled {
                    at: now,
                    reason: reason.clone(),
                },
            })
        }
        (Scheduled, Attend) => Err(SchedulingError::InvalidTransition {
            action: "attend",
            state: Scheduled,
            detail: "must confirm before attending",
        }),

        (Confirmed, Confirm) => {
            warn!(appointment_id = %appointment.id, "confirm on already-confirmed appointment, no-op");
            Ok(TransitionOutcome {
                new_state: Confirmed,
                mutation: StateMutation::None,
            })
        }
        (Confirmed, Attend) => Ok(TransitionOutcome {
            new_state: Attended,
            mutation: StateMutation::AttendanceStarted { at: now },
        }),

        // Second attend closes the attendance interval once.
        (Attended, Attend) => {
            if appointment.attendance_ended_at.is_none() {
                Ok(TransitionOutcome {
                    new_state: Attended,
                    mutation: StateMutation::AttendanceEnded { at: now },
                })
            } else {
                warn!(appointment_id = %appointment.id, "attend on finished appointment, no-op");
                Ok(TransitionOutcome {
                    new_state: Attended,
                    mutation: StateMutation::None,
                })
            }
        }

        // Cancelling twice is idempotent by design.
        (Cancelled, Cancel { .. }) => {
            warn!(appointment_id = %appointment.id, "cancel on already-cancelled appointment, no-op");
            Ok(TransitionOutcome {
                new_state: Cancelled,
                mutation: StateMutation::None,
            })
        }

        (state @ (Attended | Cancelled), action) => Err(SchedulingError::InvalidTransition {
            action: action.name(),
            state,
            detail: "appointment is in a terminal state",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use std::str::FromStr;
    use uuid::Uuid;

    fn now() -> NaiveDateTime {
        NaiveDateTime::from_str("2026-09-01T08:00:00").unwrap()
    }

    fn appointment(state: AppointmentState) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            veterinarian_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration_minutes: 30,
            state,
            is_emergency: false,
            quoted_fee: 0.0,
            created_at: now(),
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            attendance_started_at: None,
            attendance_ended_at: None,
        }
    }

    #[test]
    fn scheduled_confirm_sets_confirmed_at() {
        let outcome = apply(&appointment(AppointmentState::Scheduled), &LifecycleAction::Confirm, now()).unwrap();
        assert_eq!(outcome.new_state, AppointmentState::Confirmed);
        assert_eq!(outcome.mutation, StateMutation::Confirmed { at: now() });
    }

    #[test]
    fn scheduled_attend_is_rejected() {
        let err = apply(&appointment(AppointmentState::Scheduled), &LifecycleAction::Attend, now()).unwrap_err();
        match err {
            SchedulingError::InvalidTransition { action, state, detail } => {
                assert_eq!(action, "attend");
                assert_eq!(state, AppointmentState::Scheduled);
                assert_eq!(detail, "must confirm before attending");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cancel_carries_reason_from_both_live_states() {
        for state in [AppointmentState::Scheduled, AppointmentState::Confirmed] {
            let outcome = apply(
                &appointment(state),
                &LifecycleAction::Cancel { reason: "owner request".into() },
                now(),
            )
            .unwrap();
            assert_eq!(outcome.new_state, AppointmentState::Cancelled);
            assert_eq!(
                outcome.mutation,
                StateMutation::Cancelled { at: now(), reason: "owner request".into() }
            );
        }
    }

    #[test]
    fn confirm_twice_is_idempotent_noop() {
        let outcome = apply(&appointment(AppointmentState::Confirmed), &LifecycleAction::Confirm, now()).unwrap();
        assert_eq!(outcome.new_state, AppointmentState::Confirmed);
        assert!(outcome.is_noop());
    }

    #[test]
    fn cancel_twice_is_idempotent_noop() {
        let outcome = apply(
            &appointment(AppointmentState::Cancelled),
            &LifecycleAction::Cancel { reason: "again".into() },
            now(),
        )
        .unwrap();
        assert_eq!(outcome.new_state, AppointmentState::Cancelled);
        assert!(outcome.is_noop());
    }

    #[test]
    fn confirmed_attend_starts_attendance() {
        let outcome = apply(&appointment(AppointmentState::Confirmed), &LifecycleAction::Attend, now()).unwrap();
        assert_eq!(outcome.new_state, AppointmentState::Attended);
        assert_eq!(outcome.mutation, StateMutation::AttendanceStarted { at: now() });
    }

    #[test]
    fn second_attend_ends_attendance_once() {
        let mut apt = appointment(AppointmentState::Attended);
        apt.attendance_started_at = Some(now());

        let outcome = apply(&apt, &LifecycleAction::Attend, now()).unwrap();
        assert_eq!(outcome.mutation, StateMutation::AttendanceEnded { at: now() });
        outcome.apply_to(&mut apt);
        assert!(apt.attendance_ended_at.is_some());

        // Third call changes nothing.
        let outcome = apply(&apt, &LifecycleAction::Attend, now()).unwrap();
        assert!(outcome.is_noop());
    }

    #[test]
    fn terminal_states_reject_other_actions() {
        let cancel = LifecycleAction::Cancel { reason: "x".into() };
        let cases: [(AppointmentState, &LifecycleAction); 4] = [
            (AppointmentState::Attended, &LifecycleAction::Confirm),
            (AppointmentState::Attended, &cancel),
            (AppointmentState::Cancelled, &LifecycleAction::Confirm),
            (AppointmentState::Cancelled, &LifecycleAction::Attend),
        ];
        for (state, action) in cases {
            let err = apply(&appointment(state), action, now()).unwrap_err();
            assert!(
                matches!(err, SchedulingError::InvalidTransition { .. }),
                "{state:?} + {} should be invalid",
                action.name()
            );
        }
    }

    #[test]
    fn apply_to_writes_cancellation_fields() {
        let mut apt = appointment(AppointmentState::Scheduled);
        let outcome = apply(
            &apt,
            &LifecycleAction::Cancel { reason: "pet recovered".into() },
            now(),
        )
        .unwrap();
        outcome.apply_to(&mut apt);
        assert_eq!(apt.state, AppointmentState::Cancelled);
        assert_eq!(apt.cancelled_at, Some(now()));
        assert_eq!(apt.cancellation_reason.as_deref(), Some("pet recovered"));
    }
}
