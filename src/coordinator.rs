//! Appointment coordinator — the only component that persists appointments
//! and orchestrates across availability, lifecycle, lookups, and events.
//!
//! Booking pipeline: validate request → verify veterinarian and service are
//! active → compute availability → atomically reserve and persist → emit.
//! Reservation is race-free twice over: a per-(veterinarian, date) mutex is
//! held from the availability check through the insert, and the store
//! enforces slot uniqueness as a backstop — a losing writer gets
//! `SlotUnavailable`, never a generic persistence error.
//!
//! Persist-then-notify: no event is emitted when the underlying write fails.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Datelike, NaiveDate, NaiveTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::availability::compute_availability;
use crate::clock::Clock;
use crate::config::ClinicConfig;
use crate::db::DatabaseError;
use crate::directory::{ServiceCatalog, ServiceInfo, VeterinarianDirectory};
use crate::error::SchedulingError;
use crate::events::{AppointmentEvent, AppointmentEventSubscriber};
use crate::lifecycle::{self, LifecycleAction};
use crate::models::{Appointment, AppointmentState, DayAvailability};
use crate::pricing::{quote_fee, BookingTerms};
use crate::stores::{AppointmentStore, WorkWindowStore};

/// Booking request as received from the outer layer.
#[derive(Debug, Clone)]
pub struct CreateAppointmentRequest {
    pub pet_id: Uuid,
    pub veterinarian_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub is_emergency: bool,
}

pub struct AppointmentCoordinator {
    config: ClinicConfig,
    appointments: Arc<dyn AppointmentStore>,
    work_windows: Arc<dyn WorkWindowStore>,
    veterinarians: Arc<dyn VeterinarianDirectory>,
    services: Arc<dyn ServiceCatalog>,
    clock: Arc<dyn Clock>,
    /// Notified synchronously, in registration order, after each successful
    /// write. Ordered per appointment; no ordering across appointments.
    subscribers: Vec<Arc<dyn AppointmentEventSubscriber>>,
    /// One reservation lock per (veterinarian, date), held across the
    /// availability check and the insert.
    reservation_locks: Mutex<HashMap<(Uuid, NaiveDate), Arc<Mutex<()>>>>,
}

impl AppointmentCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ClinicConfig,
        appointments: Arc<dyn AppointmentStore>,
        work_windows: Arc<dyn WorkWindowStore>,
        veterinarians: Arc<dyn VeterinarianDirectory>,
        services: Arc<dyn ServiceCatalog>,
        clock: Arc<dyn Clock>,
        subscribers: Vec<Arc<dyn AppointmentEventSubscriber>>,
    ) -> Self {
        Self {
            config,
            appointments,
            work_windows,
            veterinarians,
            services,
            clock,
            subscribers,
            reservation_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Book a new appointment in state `Scheduled`.
    pub fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let service = self.resolve_active_service(request.service_id)?;
        if !self.veterinarians.is_active(request.veterinarian_id)? {
            return Err(SchedulingError::ResourceInactive {
                resource: "veterinarian",
                id: request.veterinarian_id,
            });
        }

        let now = self.clock.now();
        if request.date.and_time(request.start_time) <= now {
            return Err(SchedulingError::Validation(
                "appointment must be scheduled for a future time".into(),
            ));
        }

        // Hold the reservation lock across check-and-insert so two
        // concurrent requests cannot both observe the slot as free.
        let slot_lock = self.reservation_lock(request.veterinarian_id, request.date);
        let _reserved = slot_lock.lock().unwrap_or_else(|e| e.into_inner());

        let availability = self.availability_for(
            request.veterinarian_id,
            request.date,
            service.duration_minutes,
        )?;
        if !availability.has_schedule || !availability.is_free(request.start_time) {
            return Err(SchedulingError::SlotUnavailable {
                veterinarian_id: request.veterinarian_id,
                date: request.date,
                time: request.start_time,
            });
        }

        let quote = quote_fee(
            &self.config,
            &BookingTerms {
                base_fee: service.base_fee,
                date: request.date,
                is_emergency: request.is_emergency,
            },
        );

        let appointment = Appointment {
            id: Uuid::new_v4(),
            pet_id: request.pet_id,
            veterinarian_id: request.veterinarian_id,
            service_id: request.service_id,
            date: request.date,
            start_time: request.start_time,
            duration_minutes: service.duration_minutes,
            state: AppointmentState::Scheduled,
            is_emergency: request.is_emergency,
            quoted_fee: quote.total,
            created_at: now,
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            attendance_started_at: None,
            attendance_ended_at: None,
        };

        match self.appointments.insert(&appointment) {
            Ok(()) => {}
            // The store's uniqueness backstop fired: lost the race.
            Err(e) if e.is_unique_violation() => {
                warn!(
                    veterinarian_id = %request.veterinarian_id,
                    date = %request.date,
                    time = %request.start_time,
                    "reservation lost to concurrent booking"
                );
                return Err(SchedulingError::SlotUnavailable {
                    veterinarian_id: request.veterinarian_id,
                    date: request.date,
                    time: request.start_time,
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(appointment_id = %appointment.id, veterinarian_id = %appointment.veterinarian_id,
              date = %appointment.date, time = %appointment.start_time, "appointment booked");
        self.emit(AppointmentEvent::Created(appointment.clone()));
        Ok(appointment)
    }

    pub fn confirm_appointment(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.transition(id, LifecycleAction::Confirm)
    }

    pub fn cancel_appointment(
        &self,
        id: Uuid,
        reason: String,
    ) -> Result<Appointment, SchedulingError> {
        self.transition(id, LifecycleAction::Cancel { reason })
    }

    pub fn attend_appointment(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.transition(id, LifecycleAction::Attend)
    }

    /// Slot grid for one veterinarian/date/service.
    pub fn get_availability(
        &self,
        veterinarian_id: Uuid,
        date: NaiveDate,
        service_id: Uuid,
    ) -> Result<DayAvailability, SchedulingError> {
        let service = self.resolve_active_service(service_id)?;
        self.availability_for(veterinarian_id, date, service.duration_minutes)
    }

    /// Run one lifecycle action through the read-transition-write cycle,
    /// serialized per appointment by the store's compare-and-swap. A losing
    /// writer re-reads and re-applies a bounded number of times; a racing
    /// transition into a terminal state then surfaces naturally as
    /// `InvalidTransition`.
    fn transition(
        &self,
        id: Uuid,
        action: LifecycleAction,
    ) -> Result<Appointment, SchedulingError> {
        for attempt in 0..=self.config.max_transition_retries {
            let appointment = self
                .appointments
                .find_by_id(id)?
                .ok_or(SchedulingError::NotFound(id))?;
            let from = appointment.state;

            let outcome = lifecycle::apply(&appointment, &action, self.clock.now())?;
            if outcome.is_noop() {
                // Idempotent repeat: nothing to persist, nothing to emit.
                return Ok(appointment);
            }

            let mut updated = appointment;
            outcome.apply_to(&mut updated);

            if self.appointments.compare_and_swap_state(&updated, from)? {
                debug!(appointment_id = %id, action = action.name(),
                       from = from.as_str(), to = updated.state.as_str(), "transition applied");
                if updated.state != from {
                    self.emit(AppointmentEvent::StateChanged {
                        appointment: updated.clone(),
                        from,
                        to: updated.state,
                    });
                }
                return Ok(updated);
            }

            warn!(appointment_id = %id, action = action.name(), attempt,
                  "transition lost concurrent update, retrying");
        }

        Err(SchedulingError::Database(DatabaseError::ConstraintViolation(
            format!("appointment {id}: transition retry budget exhausted"),
        )))
    }

    fn resolve_active_service(&self, service_id: Uuid) -> Result<ServiceInfo, SchedulingError> {
        let service = self
            .services
            .get(service_id)?
            .ok_or_else(|| SchedulingError::Validation(format!("unknown service {service_id}")))?;
        if !service.active {
            return Err(SchedulingError::ResourceInactive {
                resource: "service",
                id: service_id,
            });
        }
        Ok(service)
    }

    fn availability_for(
        &self,
        veterinarian_id: Uuid,
        date: NaiveDate,
        duration_minutes: u32,
    ) -> Result<DayAvailability, SchedulingError> {
        let windows = self
            .work_windows
            .find_active_by_veterinarian_and_weekday(veterinarian_id, date.weekday())?;
        let existing = self
            .appointments
            .find_by_veterinarian_and_date(veterinarian_id, date)?;
        Ok(compute_availability(date, duration_minutes, &windows, &existing))
    }

    fn reservation_lock(&self, veterinarian_id: Uuid, date: NaiveDate) -> Arc<Mutex<()>> {
        let mut locks = self
            .reservation_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        // Drop entries no booking currently holds, so the map tracks
        // in-flight reservations rather than every slot key ever seen.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry((veterinarian_id, date))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn emit(&self, event: AppointmentEvent) {
        for subscriber in &self.subscribers {
            subscriber.on_event(&event);
        }
    }
}
