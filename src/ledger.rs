//! Communication delivery ledger — schedules appointment communications off
//! lifecycle events and tracks attempt counts, retry eligibility, and
//! terminal failure.
//!
//! The ledger never touches a transport: `NotificationSender` does the
//! actual sending (with its own timeouts — a timed-out send comes back as an
//! error and counts toward the attempt budget). It also owns no timer; an
//! external scheduler drives [`CommunicationLedger::retry_pending`]
//! periodically.
//!
//! Recipients are routing keys (`pet:<id>`); resolving a key to a concrete
//! address is the sender's concern.

use std::sync::Arc;

use chrono::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::ClinicConfig;
use crate::error::{SchedulingError, SendError};
use crate::events::{AppointmentEvent, AppointmentEventSubscriber};
use crate::models::{
    Appointment, AppointmentState, Communication, CommunicationChannel, CommunicationKind,
};
use crate::stores::CommunicationStore;

pub trait NotificationSender: Send + Sync {
    /// Deliver one communication; returns the transport's external id.
    fn send(&self, communication: &Communication) -> Result<String, SendError>;
}

/// Outcome of one scheduler-driven delivery round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryRound {
    pub sent_count: usize,
    pub failed_count: usize,
}

pub struct CommunicationLedger {
    config: ClinicConfig,
    store: Arc<dyn CommunicationStore>,
    sender: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
}

impl CommunicationLedger {
    pub fn new(
        config: ClinicConfig,
        store: Arc<dyn CommunicationStore>,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            sender,
            clock,
        }
    }

    /// Attempt delivery of one communication and record the outcome.
    /// Returns whether the communication went out. Already-sent and
    /// suppressed communications are skipped silently; an exhausted one is
    /// an error so schedulers cannot keep burning it.
    pub fn attempt_delivery(
        &self,
        communication: &mut Communication,
    ) -> Result<bool, SchedulingError> {
        if communication.sent || communication.suppressed {
            return Ok(false);
        }
        if communication.attempt_count >= communication.max_attempts {
            return Err(SchedulingError::DeliveryExhausted(communication.id));
        }

        match self.sender.send(communication) {
            Ok(external_id) => {
                communication.mark_sent(external_id, self.clock.now());
                self.store.update(communication)?;
                info!(communication_id = %communication.id,
                      kind = communication.kind.as_str(), "communication delivered");
                Ok(true)
            }
            Err(SendError(message)) => {
                communication.record_failure(message);
                self.store.update(communication)?;
                if communication.attempt_count >= communication.max_attempts {
                    warn!(communication_id = %communication.id,
                          attempts = communication.attempt_count,
                          last_error = communication.last_error.as_deref().unwrap_or(""),
                          "delivery exhausted, surfacing for operator attention");
                } else {
                    warn!(communication_id = %communication.id,
                          attempts = communication.attempt_count, "delivery attempt failed");
                }
                Ok(false)
            }
        }
    }

    /// One delivery round over everything due at the injected clock's now.
    /// Intended to be invoked periodically by an external scheduler.
    pub fn retry_pending(&self) -> Result<DeliveryRound, SchedulingError> {
        let now = self.clock.now();
        let due = self.store.due_for_delivery(now)?;

        let mut round = DeliveryRound::default();
        for mut communication in due {
            match self.attempt_delivery(&mut communication)? {
                true => round.sent_count += 1,
                false => round.failed_count += 1,
            }
        }
        if round.sent_count + round.failed_count > 0 {
            info!(sent = round.sent_count, failed = round.failed_count, "delivery round finished");
        }
        Ok(round)
    }

    /// Permanently failed communications, for operator inspection. These
    /// never disappear silently and are never retried by the scheduler.
    pub fn exhausted(&self) -> Result<Vec<Communication>, SchedulingError> {
        Ok(self.store.exhausted()?)
    }

    // ─── Event handling ──────────────────────────────────────────────────

    fn schedule_for_created(&self, appointment: &Appointment) -> Result<(), SchedulingError> {
        let now = self.clock.now();
        let reminder_at =
            appointment.start_datetime() - Duration::hours(self.config.reminder_lead_hours);

        let reminder = Communication {
            id: Uuid::new_v4(),
            kind: CommunicationKind::Reminder,
            channel: CommunicationChannel::Email,
            recipient: format!("pet:{}", appointment.pet_id),
            subject: "Appointment reminder".into(),
            body: format!(
                "Reminder: appointment on {} at {}.",
                appointment.date, appointment.start_time
            ),
            appointment_id: Some(appointment.id),
            scheduled_send_time: Some(reminder_at),
            sent: false,
            sent_at: None,
            suppressed: false,
            attempt_count: 0,
            max_attempts: self.config.max_delivery_attempts,
            last_error: None,
            external_id: None,
            created_at: now,
        };
        self.store.insert(&reminder)?;

        if self.config.notify_on_creation {
            let notification = Communication {
                id: Uuid::new_v4(),
                kind: CommunicationKind::Notification,
                channel: CommunicationChannel::Push,
                recipient: format!("pet:{}", appointment.pet_id),
                subject: "Appointment booked".into(),
                body: format!(
                    "Your appointment is booked for {} at {}.",
                    appointment.date, appointment.start_time
                ),
                appointment_id: Some(appointment.id),
                // Due immediately.
                scheduled_send_time: None,
                sent: false,
                sent_at: None,
                suppressed: false,
                attempt_count: 0,
                max_attempts: self.config.max_delivery_attempts,
                last_error: None,
                external_id: None,
                created_at: now,
            };
            self.store.insert(&notification)?;
        }
        Ok(())
    }

    fn suppress_for_cancelled(&self, appointment: &Appointment) -> Result<(), SchedulingError> {
        let suppressed = self.store.suppress_unsent_for_appointment(appointment.id)?;
        if suppressed > 0 {
            info!(appointment_id = %appointment.id, suppressed,
                  "withdrew reminders for cancelled appointment");
        }
        Ok(())
    }
}

impl AppointmentEventSubscriber for CommunicationLedger {
    fn on_event(&self, event: &AppointmentEvent) {
        let result = match event {
            AppointmentEvent::Created(appointment) => self.schedule_for_created(appointment),
            AppointmentEvent::StateChanged {
                appointment,
                to: AppointmentState::Cancelled,
                ..
            } => self.suppress_for_cancelled(appointment),
            AppointmentEvent::StateChanged { .. } => Ok(()),
        };
        // Best effort: a bookkeeping failure must not fail the lifecycle
        // operation that triggered it.
        if let Err(e) = result {
            error!(appointment_id = %event.appointment().id, error = %e,
                   "communication bookkeeping failed");
        }
    }
}
