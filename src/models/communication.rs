use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CommunicationChannel, CommunicationKind};

/// Derived delivery state of a communication. Not stored — computed from
/// the persisted fields by [`Communication::delivery_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Not yet sent, retry budget remaining.
    Pending,
    Sent,
    /// Withdrawn before sending (e.g. its appointment was cancelled).
    Suppressed,
    /// Permanently failed: attempt budget spent while unsent. Surfaced for
    /// operator inspection, never retried.
    Exhausted,
}

/// An outbound reminder/notification/email, optionally tied to an
/// appointment. Created by the delivery ledger; mutated by delivery
/// attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Communication {
    pub id: Uuid,
    pub kind: CommunicationKind,
    pub channel: CommunicationChannel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub appointment_id: Option<Uuid>,
    pub scheduled_send_time: Option<NaiveDateTime>,
    pub sent: bool,
    pub sent_at: Option<NaiveDateTime>,
    pub suppressed: bool,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub external_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Communication {
    /// Record a successful delivery. Clears any previous error; once sent,
    /// no further attempts occur.
    pub fn mark_sent(&mut self, external_id: String, now: NaiveDateTime) {
        self.sent = true;
        self.sent_at = Some(now);
        self.external_id = Some(external_id);
        self.last_error = None;
    }

    /// Record a failed delivery attempt (counts toward the retry budget).
    pub fn record_failure(&mut self, error: String) {
        self.attempt_count += 1;
        self.last_error = Some(error);
    }

    /// Whether the scheduler may attempt delivery again.
    pub fn can_retry(&self) -> bool {
        !self.sent && !self.suppressed && self.attempt_count < self.max_attempts
    }

    /// Whether the communication is ready to go out at `now`.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.can_retry() && self.scheduled_send_time.map_or(true, |at| at <= now)
    }

    pub fn delivery_status(&self) -> DeliveryStatus {
        if self.sent {
            DeliveryStatus::Sent
        } else if self.suppressed {
            DeliveryStatus::Suppressed
        } else if self.attempt_count >= self.max_attempts {
            DeliveryStatus::Exhausted
        } else {
            DeliveryStatus::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample() -> Communication {
        Communication {
            id: Uuid::new_v4(),
            kind: CommunicationKind::Reminder,
            channel: CommunicationChannel::Email,
            recipient: "owner@example.com".into(),
            subject: "Appointment reminder".into(),
            body: "See you tomorrow".into(),
            appointment_id: Some(Uuid::new_v4()),
            scheduled_send_time: Some(NaiveDateTime::from_str("2026-09-01T09:00:00").unwrap()),
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
    fn mark_sent_clears_last_error() {
        let mut comm = sample();
        comm.record_failure("smtp timeout".into());
        assert_eq!(comm.attempt_count, 1);
        comm.mark_sent("ext-42".into(), comm.created_at);
        assert!(comm.sent);
        assert!(comm.last_error.is_none());
        assert_eq!(comm.delivery_status(), DeliveryStatus::Sent);
        assert!(!comm.can_retry());
    }

    #[test]
    fn exhausted_after_max_attempts() {
        let mut comm = sample();
        for _ in 0..3 {
            assert!(comm.can_retry());
            comm.record_failure("unreachable".into());
        }
        assert!(!comm.can_retry());
        assert_eq!(comm.delivery_status(), DeliveryStatus::Exhausted);
        assert_eq!(comm.last_error.as_deref(), Some("unreachable"));
    }

    #[test]
    fn not_due_before_scheduled_time() {
        let comm = sample();
        let before = NaiveDateTime::from_str("2026-09-01T08:59:00").unwrap();
        let after = NaiveDateTime::from_str("2026-09-01T09:00:00").unwrap();
        assert!(!comm.is_due(before));
        assert!(comm.is_due(after));
    }

    #[test]
    fn suppressed_is_never_due() {
        let mut comm = sample();
        comm.suppressed = true;
        let late = NaiveDateTime::from_str("2026-09-02T00:00:00").unwrap();
        assert!(!comm.is_due(late));
        assert_eq!(comm.delivery_status(), DeliveryStatus::Suppressed);
    }
}
