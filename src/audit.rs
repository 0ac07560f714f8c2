//! Audit trail — records every lifecycle event in the audit_log table.
//!
//! Constructed explicitly and registered as an event subscriber; there is
//! no process-wide audit singleton.

use chrono::NaiveDateTime;
use serde_json::json;
use tracing::error;

use crate::clock::Clock;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::events::{AppointmentEvent, AppointmentEventSubscriber};
use crate::stores::SharedConnection;
use std::sync::Arc;

pub struct AuditTrail {
    conn: SharedConnection,
    clock: Arc<dyn Clock>,
}

impl AuditTrail {
    pub fn new(conn: SharedConnection, clock: Arc<dyn Clock>) -> Self {
        Self { conn, clock }
    }

    fn record(&self, event: &AppointmentEvent, now: NaiveDateTime) -> Result<(), DatabaseError> {
        let (action, detail) = match event {
            AppointmentEvent::Created(apt) => (
                "created".to_string(),
                json!({
                    "veterinarian_id": apt.veterinarian_id,
                    "date": apt.date,
                    "start_time": apt.start_time,
                    "is_emergency": apt.is_emergency,
                }),
            ),
            AppointmentEvent::StateChanged { from, to, .. } => (
                to.as_str().to_string(),
                json!({ "from": from.as_str(), "to": to.as_str() }),
            ),
        };
        let entity = format!("appointment:{}", event.appointment().id);
        let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();

        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::insert_audit_entries(
            &conn,
            &[(timestamp, action, entity, Some(detail.to_string()))],
        )
    }

    /// Recent audit history for one appointment, newest first.
    pub fn history(
        &self,
        appointment_id: uuid::Uuid,
        limit: usize,
    ) -> Result<Vec<(String, String, Option<String>)>, DatabaseError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        repository::query_audit_by_entity(&conn, &format!("appointment:{appointment_id}"), limit)
    }
}

impl AppointmentEventSubscriber for AuditTrail {
    fn on_event(&self, event: &AppointmentEvent) {
        // Best effort: auditing must not fail the operation being audited.
        if let Err(e) = self.record(event, self.clock.now()) {
            error!(appointment_id = %event.appointment().id, error = %e, "audit write failed");
        }
    }
}
