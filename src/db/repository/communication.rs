use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_datetime, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Communication, CommunicationChannel, CommunicationKind};

const COLUMNS: &str = "id, kind, channel, recipient, subject, body, appointment_id,
     scheduled_send_time, sent, sent_at, suppressed, attempt_count, max_attempts,
     last_error, external_id, created_at";

pub fn insert_communication(conn: &Connection, comm: &Communication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO communications (id, kind, channel, recipient, subject, body,
         appointment_id, scheduled_send_time, sent, sent_at, suppressed, attempt_count,
         max_attempts, last_error, external_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            comm.id.to_string(),
            comm.kind.as_str(),
            comm.channel.as_str(),
            comm.recipient,
            comm.subject,
            comm.body,
            comm.appointment_id.map(|id| id.to_string()),
            comm.scheduled_send_time.as_ref().map(fmt_datetime),
            comm.sent as i32,
            comm.sent_at.as_ref().map(fmt_datetime),
            comm.suppressed as i32,
            comm.attempt_count,
            comm.max_attempts,
            comm.last_error,
            comm.external_id,
            fmt_datetime(&comm.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_communication(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Communication>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {COLUMNS} FROM communications WHERE id = ?1"))?;
    let result = stmt.query_row(params![id.to_string()], read_row);
    match result {
        Ok(row) => Ok(Some(communication_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Rewrite the delivery-mutable fields of a communication.
pub fn update_communication(conn: &Connection, comm: &Communication) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE communications SET
             sent = ?1, sent_at = ?2, suppressed = ?3, attempt_count = ?4,
             last_error = ?5, external_id = ?6
         WHERE id = ?7",
        params![
            comm.sent as i32,
            comm.sent_at.as_ref().map(fmt_datetime),
            comm.suppressed as i32,
            comm.attempt_count,
            comm.last_error,
            comm.external_id,
            comm.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "communication".into(),
            id: comm.id.to_string(),
        });
    }
    Ok(())
}

/// Unsent, unsuppressed communications with budget left whose scheduled
/// send time (if any) has passed, ordered by schedule.
pub fn list_due_communications(
    conn: &Connection,
    now: NaiveDateTime,
) -> Result<Vec<Communication>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM communications
         WHERE sent = 0 AND suppressed = 0 AND attempt_count < max_attempts
           AND (scheduled_send_time IS NULL OR scheduled_send_time <= ?1)
         ORDER BY scheduled_send_time ASC"
    ))?;
    let rows = stmt
        .query_map(params![fmt_datetime(&now)], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(communication_from_row).collect()
}

/// Permanently failed communications, for operator inspection.
pub fn list_exhausted_communications(
    conn: &Connection,
) -> Result<Vec<Communication>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM communications
         WHERE sent = 0 AND suppressed = 0 AND attempt_count >= max_attempts
         ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map([], read_row)?.collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(communication_from_row).collect()
}

/// Withdraw still-unsent reminders tied to an appointment. Returns how many
/// were suppressed.
pub fn suppress_unsent_reminders(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<usize, DatabaseError> {
    let suppressed = conn.execute(
        "UPDATE communications SET suppressed = 1
         WHERE appointment_id = ?1 AND kind = 'reminder' AND sent = 0 AND suppressed = 0",
        params![appointment_id.to_string()],
    )?;
    Ok(suppressed)
}

// Internal row type for Communication mapping
struct CommunicationRow {
    id: String,
    kind: String,
    channel: String,
    recipient: String,
    subject: String,
    body: String,
    appointment_id: Option<String>,
    scheduled_send_time: Option<String>,
    sent: i32,
    sent_at: Option<String>,
    suppressed: i32,
    attempt_count: u32,
    max_attempts: u32,
    last_error: Option<String>,
    external_id: Option<String>,
    created_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommunicationRow> {
    Ok(CommunicationRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        channel: row.get(2)?,
        recipient: row.get(3)?,
        subject: row.get(4)?,
        body: row.get(5)?,
        appointment_id: row.get(6)?,
        scheduled_send_time: row.get(7)?,
        sent: row.get(8)?,
        sent_at: row.get(9)?,
        suppressed: row.get(10)?,
        attempt_count: row.get(11)?,
        max_attempts: row.get(12)?,
        last_error: row.get(13)?,
        external_id: row.get(14)?,
        created_at: row.get(15)?,
    })
}

fn communication_from_row(row: CommunicationRow) -> Result<Communication, DatabaseError> {
    Ok(Communication {
        id: parse_uuid(&row.id)?,
        kind: CommunicationKind::from_str(&row.kind)?,
        channel: CommunicationChannel::from_str(&row.channel)?,
        recipient: row.recipient,
        subject: row.subject,
        body: row.body,
        appointment_id: row.appointment_id.as_deref().map(parse_uuid).transpose()?,
        scheduled_send_time: row
            .scheduled_send_time
            .as_deref()
            .map(parse_datetime)
            .transpose()?,
        sent: row.sent != 0,
        sent_at: row.sent_at.as_deref().map(parse_datetime).transpose()?,
        suppressed: row.suppressed != 0,
        attempt_count: row.attempt_count,
        max_attempts: row.max_attempts,
        last_error: row.last_error,
        external_id: row.external_id,
        created_at: parse_datetime(&row.created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn sample(kind: CommunicationKind, appointment_id: Option<Uuid>, at: &str) -> Communication {
        Communication {
            id: Uuid::new_v4(),
            kind,
            channel: CommunicationChannel::Email,
            recipient: "owner@example.com".into(),
            subject: "subject".into(),
            body: "body".into(),
            appointment_id,
            scheduled_send_time: Some(NaiveDateTime::from_str(at).unwrap()),
            sent: false,
            sent_at: None,
            suppressed: false,
            attempt_count: 0,
            max_attempts: 3,
            last_error: None,
            external_id: None,
            created_at: NaiveDateTime::from_str("2026-08-30T12:00:00").unwrap(),
        }
    }

    #[test]
    fn round_trip_preserves_fields() {
        let conn = open_memory_database().unwrap();
        let comm = sample(CommunicationKind::Reminder, Some(Uuid::new_v4()), "2026-09-01T09:00:00");
        insert_communication(&conn, &comm).unwrap();

        let loaded = get_communication(&conn, &comm.id).unwrap().unwrap();
        assert_eq!(loaded.kind, CommunicationKind::Reminder);
        assert_eq!(loaded.appointment_id, comm.appointment_id);
        assert_eq!(loaded.scheduled_send_time, comm.scheduled_send_time);
        assert!(!loaded.sent);
    }

    #[test]
    fn due_listing_honors_schedule_and_budget() {
        let conn = open_memory_database().unwrap();
        let now = NaiveDateTime::from_str("2026-09-01T10:00:00").unwrap();

        let due = sample(CommunicationKind::Reminder, None, "2026-09-01T09:00:00");
        let future = sample(CommunicationKind::Reminder, None, "2026-09-02T09:00:00");
        let mut spent = sample(CommunicationKind::Notification, None, "2026-09-01T08:00:00");
        spent.attempt_count = 3;
        insert_communication(&conn, &due).unwrap();
        insert_communication(&conn, &future).unwrap();
        insert_communication(&conn, &spent).unwrap();

        let ids: Vec<Uuid> = list_due_communications(&conn, now)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![due.id]);

        let exhausted = list_exhausted_communications(&conn).unwrap();
        assert_eq!(exhausted.len(), 1);
        assert_eq!(exhausted[0].id, spent.id);
    }

    #[test]
    fn suppress_targets_unsent_reminders_only() {
        let conn = open_memory_database().unwrap();
        let apt = Uuid::new_v4();

        let reminder = sample(CommunicationKind::Reminder, Some(apt), "2026-09-01T09:00:00");
        let mut sent_reminder = sample(CommunicationKind::Reminder, Some(apt), "2026-09-01T09:00:00");
        sent_reminder.sent = true;
        let notification = sample(CommunicationKind::Notification, Some(apt), "2026-09-01T09:00:00");
        insert_communication(&conn, &reminder).unwrap();
        insert_communication(&conn, &sent_reminder).unwrap();
        insert_communication(&conn, &notification).unwrap();

        let count = suppress_unsent_reminders(&conn, &apt).unwrap();
        assert_eq!(count, 1);

        let loaded = get_communication(&conn, &reminder.id).unwrap().unwrap();
        assert!(loaded.suppressed);
        let loaded = get_communication(&conn, &sent_reminder.id).unwrap().unwrap();
        assert!(!loaded.suppressed);
    }

    #[test]
    fn update_persists_delivery_outcome() {
        let conn = open_memory_database().unwrap();
        let mut comm = sample(CommunicationKind::Email, None, "2026-09-01T09:00:00");
        insert_communication(&conn, &comm).unwrap();

        comm.record_failure("smtp timeout".into());
        update_communication(&conn, &comm).unwrap();
        let loaded = get_communication(&conn, &comm.id).unwrap().unwrap();
        assert_eq!(loaded.attempt_count, 1);
        assert_eq!(loaded.last_error.as_deref(), Some("smtp timeout"));

        comm.mark_sent("ext-7".into(), comm.created_at);
        update_communication(&conn, &comm).unwrap();
        let loaded = get_communication(&conn, &comm.id).unwrap().unwrap();
        assert!(loaded.sent);
        assert!(loaded.last_error.is_none());
        assert_eq!(loaded.external_id.as_deref(), Some("ext-7"));
    }
}
