pub mod appointment;
pub mod audit;
pub mod communication;
pub mod work_window;

pub use appointment::*;
pub use audit::*;
pub use communication::*;
pub use work_window::*;

use chrono::{NaiveDateTime, NaiveTime};

use super::DatabaseError;

pub(crate) fn fmt_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(crate) fn parse_datetime(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad datetime '{s}': {e}")))
}

pub(crate) fn parse_time(s: &str) -> Result<NaiveTime, DatabaseError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad time '{s}': {e}")))
}

pub(crate) fn parse_uuid(s: &str) -> Result<uuid::Uuid, DatabaseError> {
    uuid::Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
