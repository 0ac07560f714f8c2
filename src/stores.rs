//! Storage collaborator contracts and their two implementations.
//!
//! The coordinator and ledger only know these traits. `Memory*` stores back
//! tests and small deployments; `Sqlite*` stores share one connection
//! behind a mutex and delegate to the `db::repository` functions.
//!
//! Both appointment stores uphold the reservation invariant at the storage
//! layer: inserting a second non-cancelled appointment for the same
//! (veterinarian, date, start_time) fails with a constraint violation, so a
//! losing concurrent writer can be answered with `SlotUnavailable` rather
//! than a generic persistence error.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::{Appointment, AppointmentState, Communication, WorkWindow};

pub trait AppointmentStore: Send + Sync {
    fn insert(&self, appointment: &Appointment) -> Result<(), DatabaseError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError>;
    fn find_by_veterinarian_and_date(
        &self,
        veterinarian_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, DatabaseError>;
    /// Optimistic update: write `appointment` only if the stored row is
    /// still in `expected` state. Returns false when a concurrent
    /// transition won the race.
    fn compare_and_swap_state(
        &self,
        appointment: &Appointment,
        expected: AppointmentState,
    ) -> Result<bool, DatabaseError>;
}

pub trait WorkWindowStore: Send + Sync {
    fn insert(&self, window: &WorkWindow) -> Result<(), DatabaseError>;
    fn find_active_by_veterinarian_and_weekday(
        &self,
        veterinarian_id: Uuid,
        weekday: Weekday,
    ) -> Result<Vec<WorkWindow>, DatabaseError>;
}

pub trait CommunicationStore: Send + Sync {
    fn insert(&self, communication: &Communication) -> Result<(), DatabaseError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Communication>, DatabaseError>;
    fn update(&self, communication: &Communication) -> Result<(), DatabaseError>;
    fn due_for_delivery(&self, now: NaiveDateTime) -> Result<Vec<Communication>, DatabaseError>;
    fn suppress_unsent_for_appointment(&self, appointment_id: Uuid)
        -> Result<usize, DatabaseError>;
    fn exhausted(&self) -> Result<Vec<Communication>, DatabaseError>;
}

// ═══════════════════════════════════════════
// In-memory stores
// ═══════════════════════════════════════════

#[derive(Default)]
pub struct MemoryAppointmentStore {
    rows: RwLock<HashMap<Uuid, Appointment>>,
}

impl MemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AppointmentStore for MemoryAppointmentStore {
    fn insert(&self, appointment: &Appointment) -> Result<(), DatabaseError> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        let slot_taken = rows.values().any(|a| {
            a.state != AppointmentState::Cancelled
                && a.veterinarian_id == appointment.veterinarian_id
                && a.date == appointment.date
                && a.start_time == appointment.start_time
        });
        if slot_taken {
            return Err(DatabaseError::ConstraintViolation(format!(
                "slot {} {} already reserved for veterinarian {}",
                appointment.date, appointment.start_time, appointment.veterinarian_id
            )));
        }
        rows.insert(appointment.id, appointment.clone());
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError> {
        Ok(self
            .rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }

    fn find_by_veterinarian_and_date(
        &self,
        veterinarian_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        let mut day: Vec<Appointment> = rows
            .values()
            .filter(|a| a.veterinarian_id == veterinarian_id && a.date == date)
            .cloned()
            .collect();
        day.sort_by_key(|a| a.start_time);
        Ok(day)
    }

    fn compare_and_swap_state(
        &self,
        appointment: &Appointment,
        expected: AppointmentState,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        match rows.get_mut(&appointment.id) {
            Some(stored) if stored.state == expected => {
                *stored = appointment.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryWorkWindowStore {
    rows: RwLock<Vec<WorkWindow>>,
}

impl MemoryWorkWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkWindowStore for MemoryWorkWindowStore {
    fn insert(&self, window: &WorkWindow) -> Result<(), DatabaseError> {
        self.rows
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(window.clone());
        Ok(())
    }

    fn find_active_by_veterinarian_and_weekday(
        &self,
        veterinarian_id: Uuid,
        weekday: Weekday,
    ) -> Result<Vec<WorkWindow>, DatabaseError> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        let mut windows: Vec<WorkWindow> = rows
            .iter()
            .filter(|w| w.active && w.veterinarian_id == veterinarian_id && w.weekday == weekday)
            .cloned()
            .collect();
        windows.sort_by_key(|w| w.start_time);
        Ok(windows)
    }
}

#[derive(Default)]
pub struct MemoryCommunicationStore {
    rows: RwLock<HashMap<Uuid, Communication>>,
}

impl MemoryCommunicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: all communications tied to an appointment.
    pub fn for_appointment(&self, appointment_id: Uuid) -> Vec<Communication> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        let mut comms: Vec<Communication> = rows
            .values()
            .filter(|c| c.appointment_id == Some(appointment_id))
            .cloned()
            .collect();
        comms.sort_by_key(|c| c.created_at);
        comms
    }
}

impl CommunicationStore for MemoryCommunicationStore {
    fn insert(&self, communication: &Communication) -> Result<(), DatabaseError> {
        self.rows
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(communication.id, communication.clone());
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Communication>, DatabaseError> {
        Ok(self
            .rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }

    fn update(&self, communication: &Communication) -> Result<(), DatabaseError> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        match rows.get_mut(&communication.id) {
            Some(stored) => {
                *stored = communication.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound {
                entity_type: "communication".into(),
                id: communication.id.to_string(),
            }),
        }
    }

    fn due_for_delivery(&self, now: NaiveDateTime) -> Result<Vec<Communication>, DatabaseError> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        let mut due: Vec<Communication> = rows
            .values()
            .filter(|c| c.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|c| c.scheduled_send_time);
        Ok(due)
    }

    fn suppress_unsent_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<usize, DatabaseError> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        let mut suppressed = 0;
        for comm in rows.values_mut() {
            if comm.appointment_id == Some(appointment_id)
                && comm.kind == crate::models::CommunicationKind::Reminder
                && !comm.sent
                && !comm.suppressed
            {
                comm.suppressed = true;
                suppressed += 1;
            }
        }
        Ok(suppressed)
    }

    fn exhausted(&self) -> Result<Vec<Communication>, DatabaseError> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        let mut spent: Vec<Communication> = rows
            .values()
            .filter(|c| !c.sent && !c.suppressed && c.attempt_count >= c.max_attempts)
            .cloned()
            .collect();
        spent.sort_by_key(|c| c.created_at);
        Ok(spent)
    }
}

// ═══════════════════════════════════════════
// SQLite stores
// ═══════════════════════════════════════════

/// Shared connection handle for the SQLite-backed stores.
pub type SharedConnection = Arc<Mutex<Connection>>;

pub fn shared_connection(conn: Connection) -> SharedConnection {
    Arc::new(Mutex::new(conn))
}

pub struct SqliteAppointmentStore {
    conn: SharedConnection,
}

impl SqliteAppointmentStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl AppointmentStore for SqliteAppointmentStore {
    fn insert(&self, appointment: &Appointment) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::insert_appointment(&conn, appointment)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::get_appointment(&conn, &id)
    }

    fn find_by_veterinarian_and_date(
        &self,
        veterinarian_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::list_appointments_for_day(&conn, &veterinarian_id, date)
    }

    fn compare_and_swap_state(
        &self,
        appointment: &Appointment,
        expected: AppointmentState,
    ) -> Result<bool, DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::update_appointment_if_state(&conn, appointment, expected)
    }
}

pub struct SqliteWorkWindowStore {
    conn: SharedConnection,
}

impl SqliteWorkWindowStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl WorkWindowStore for SqliteWorkWindowStore {
    fn insert(&self, window: &WorkWindow) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::insert_work_window(&conn, window)
    }

    fn find_active_by_veterinarian_and_weekday(
        &self,
        veterinarian_id: Uuid,
        weekday: Weekday,
    ) -> Result<Vec<WorkWindow>, DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::list_active_windows(&conn, &veterinarian_id, weekday)
    }
}

pub struct SqliteCommunicationStore {
    conn: SharedConnection,
}

impl SqliteCommunicationStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl CommunicationStore for SqliteCommunicationStore {
    fn insert(&self, communication: &Communication) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::insert_communication(&conn, communication)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Communication>, DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::get_communication(&conn, &id)
    }

    fn update(&self, communication: &Communication) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::update_communication(&conn, communication)
    }

    fn due_for_delivery(&self, now: NaiveDateTime) -> Result<Vec<Communication>, DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::list_due_communications(&conn, now)
    }

    fn suppress_unsent_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<usize, DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::suppress_unsent_reminders(&conn, &appointment_id)
    }

    fn exhausted(&self) -> Result<Vec<Communication>, DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::list_exhausted_communications(&conn)
    }
}
