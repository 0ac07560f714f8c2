use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Insert a batch of audit entries into the audit_log table.
/// Entries are (timestamp, action, entity, detail) tuples; detail is a JSON
/// payload.
pub fn insert_audit_entries(
    conn: &Connection,
    entries: &[(String, String, String, Option<String>)],
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO audit_log (timestamp, action, entity, detail) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (timestamp, action, entity, detail) in entries {
        stmt.execute(params![timestamp, action, entity, detail])?;
    }
    Ok(())
}

/// Prune audit entries older than the given number of days.
pub fn prune_audit_log(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE timestamp < datetime('now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}

/// Most recent audit entries for one entity, newest first.
pub fn query_audit_by_entity(
    conn: &Connection,
    entity: &str,
    limit: usize,
) -> Result<Vec<(String, String, Option<String>)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, action, detail FROM audit_log
         WHERE entity = ?1
         ORDER BY id DESC
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![entity, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn insert_and_query_by_entity() {
        let conn = open_memory_database().unwrap();
        insert_audit_entries(
            &conn,
            &[
                ("2026-09-01 09:00:00".into(), "created".into(), "apt-1".into(), None),
                ("2026-09-01 09:05:00".into(), "confirmed".into(), "apt-1".into(), None),
                ("2026-09-01 09:06:00".into(), "created".into(), "apt-2".into(), None),
            ],
        )
        .unwrap();

        let entries = query_audit_by_entity(&conn, "apt-1", 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, "confirmed");
    }

    #[test]
    fn prune_drops_only_old_entries() {
        let conn = open_memory_database().unwrap();
        insert_audit_entries(
            &conn,
            &[
                ("2020-01-01 09:00:00".into(), "created".into(), "apt-1".into(), None),
                ("2999-01-01 09:00:00".into(), "created".into(), "apt-2".into(), None),
            ],
        )
        .unwrap();

        let deleted = prune_audit_log(&conn, 365).unwrap();
        assert_eq!(deleted, 1);
        assert!(query_audit_by_entity(&conn, "apt-1", 10).unwrap().is_empty());
        assert_eq!(query_audit_by_entity(&conn, "apt-2", 10).unwrap().len(), 1);
    }
}
