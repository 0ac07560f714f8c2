use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_time, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentState};

const COLUMNS: &str = "id, pet_id, veterinarian_id, service_id, date, start_time,
     duration_minutes, state, is_emergency, quoted_fee, created_at, confirmed_at,
     cancelled_at, cancellation_reason, attendance_started_at, attendance_ended_at";

pub fn insert_appointment(conn: &Connection, apt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, pet_id, veterinarian_id, service_id, date, start_time,
         duration_minutes, state, is_emergency, quoted_fee, created_at, confirmed_at,
         cancelled_at, cancellation_reason, attendance_started_at, attendance_ended_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            apt.id.to_string(),
            apt.pet_id.to_string(),
            apt.veterinarian_id.to_string(),
            apt.service_id.to_string(),
            apt.date.to_string(),
            apt.start_time.format("%H:%M:%S").to_string(),
            apt.duration_minutes,
            apt.state.as_str(),
            apt.is_emergency as i32,
            apt.quoted_fee,
            fmt_datetime(&apt.created_at),
            apt.confirmed_at.as_ref().map(fmt_datetime),
            apt.cancelled_at.as_ref().map(fmt_datetime),
            apt.cancellation_reason,
            apt.attendance_started_at.as_ref().map(fmt_datetime),
            apt.attendance_ended_at.as_ref().map(fmt_datetime),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {COLUMNS} FROM appointments WHERE id = ?1"))?;

    let result = stmt.query_row(params![id.to_string()], read_row);
    match result {
        Ok(row) => Ok(Some(appointment_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All appointments for one veterinarian on one date, any state, ordered by
/// start time.
pub fn list_appointments_for_day(
    conn: &Connection,
    veterinarian_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM appointments
         WHERE veterinarian_id = ?1 AND date = ?2
         ORDER BY start_time ASC"
    ))?;
    let rows = stmt
        .query_map(params![veterinarian_id.to_string(), date.to_string()], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(appointment_from_row).collect()
}

/// Optimistic state update: rewrite the row only if it is still in
/// `expected` state. Returns false when a concurrent transition won.
pub fn update_appointment_if_state(
    conn: &Connection,
    apt: &Appointment,
    expected: AppointmentState,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET
             state = ?1, confirmed_at = ?2, cancelled_at = ?3, cancellation_reason = ?4,
             attendance_started_at = ?5, attendance_ended_at = ?6
         WHERE id = ?7 AND state = ?8",
        params![
            apt.state.as_str(),
            apt.confirmed_at.as_ref().map(fmt_datetime),
            apt.cancelled_at.as_ref().map(fmt_datetime),
            apt.cancellation_reason,
            apt.attendance_started_at.as_ref().map(fmt_datetime),
            apt.attendance_ended_at.as_ref().map(fmt_datetime),
            apt.id.to_string(),
            expected.as_str(),
        ],
    )?;
    Ok(updated == 1)
}

// Internal row type for Appointment mapping
struct AppointmentRow {
    id: String,
    pet_id: String,
    veterinarian_id: String,
    service_id: String,
    date: String,
    start_time: String,
    duration_minutes: u32,
    state: String,
    is_emergency: i32,
    quoted_fee: f64,
    created_at: String,
    confirmed_at: Option<String>,
    cancelled_at: Option<String>,
    cancellation_reason: Option<String>,
    attendance_started_at: Option<String>,
    attendance_ended_at: Option<String>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        pet_id: row.get(1)?,
        veterinarian_id: row.get(2)?,
        service_id: row.get(3)?,
        date: row.get(4)?,
        start_time: row.get(5)?,
        duration_minutes: row.get(6)?,
        state: row.get(7)?,
        is_emergency: row.get(8)?,
        quoted_fee: row.get(9)?,
        created_at: row.get(10)?,
        confirmed_at: row.get(11)?,
        cancelled_at: row.get(12)?,
        cancellation_reason: row.get(13)?,
        attendance_started_at: row.get(14)?,
        attendance_ended_at: row.get(15)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        pet_id: parse_uuid(&row.pet_id)?,
        veterinarian_id: parse_uuid(&row.veterinarian_id)?,
        service_id: parse_uuid(&row.service_id)?,
        date: NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .map_err(|e| DatabaseError::ConstraintViolation(format!("bad date '{}': {e}", row.date)))?,
        start_time: parse_time(&row.start_time)?,
        duration_minutes: row.duration_minutes,
        state: AppointmentState::from_str(&row.state)?,
        is_emergency: row.is_emergency != 0,
        quoted_fee: row.quoted_fee,
        created_at: parse_datetime(&row.created_at)?,
        confirmed_at: row.confirmed_at.as_deref().map(parse_datetime).transpose()?,
        cancelled_at: row.cancelled_at.as_deref().map(parse_datetime).transpose()?,
        cancellation_reason: row.cancellation_reason,
        attendance_started_at: row
            .attendance_started_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?,
        attendance_ended_at: row
            .attendance_ended_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?,
    })
}
