use chrono::Weekday;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_time, parse_uuid};
use crate::db::DatabaseError;
use crate::models::WorkWindow;

pub fn insert_work_window(conn: &Connection, window: &WorkWindow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO work_windows (id, veterinarian_id, weekday, start_time, end_time, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            window.id.to_string(),
            window.veterinarian_id.to_string(),
            window.weekday.num_days_from_monday(),
            window.start_time.format("%H:%M:%S").to_string(),
            window.end_time.format("%H:%M:%S").to_string(),
            window.active as i32,
        ],
    )?;
    Ok(())
}

pub fn set_work_window_active(
    conn: &Connection,
    id: &Uuid,
    active: bool,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE work_windows SET active = ?1 WHERE id = ?2",
        params![active as i32, id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "work_window".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Active windows for one veterinarian on one weekday, ordered by start.
pub fn list_active_windows(
    conn: &Connection,
    veterinarian_id: &Uuid,
    weekday: Weekday,
) -> Result<Vec<WorkWindow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, veterinarian_id, weekday, start_time, end_time, active
         FROM work_windows
         WHERE veterinarian_id = ?1 AND weekday = ?2 AND active = 1
         ORDER BY start_time ASC",
    )?;
    let rows = stmt
        .query_map(
            params![veterinarian_id.to_string(), weekday.num_days_from_monday()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i32>(5)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, vet_id, weekday, start, end, active)| {
            Ok(WorkWindow {
                id: parse_uuid(&id)?,
                veterinarian_id: parse_uuid(&vet_id)?,
                weekday: weekday_from_number(weekday)?,
                start_time: parse_time(&start)?,
                end_time: parse_time(&end)?,
                active: active != 0,
            })
        })
        .collect()
}

fn weekday_from_number(n: u32) -> Result<Weekday, DatabaseError> {
    match n {
        0 => Ok(Weekday::Mon),
        1 => Ok(Weekday::Tue),
        2 => Ok(Weekday::Wed),
        3 => Ok(Weekday::Thu),
        4 => Ok(Weekday::Fri),
        5 => Ok(Weekday::Sat),
        6 => Ok(Weekday::Sun),
        _ => Err(DatabaseError::InvalidEnum {
            field: "weekday".into(),
            value: n.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn lists_only_matching_active_windows() {
        let conn = open_memory_database().unwrap();
        let vet = Uuid::new_v4();
        insert_work_window(&conn, &WorkWindow::new(vet, Weekday::Tue, t(9, 0), t(12, 0))).unwrap();
        insert_work_window(&conn, &WorkWindow::new(vet, Weekday::Wed, t(9, 0), t(12, 0))).unwrap();

        let mut inactive = WorkWindow::new(vet, Weekday::Tue, t(14, 0), t(17, 0));
        inactive.active = false;
        insert_work_window(&conn, &inactive).unwrap();

        let windows = list_active_windows(&conn, &vet, Weekday::Tue).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].weekday, Weekday::Tue);
        assert_eq!(windows[0].start_time, t(9, 0));
    }

    #[test]
    fn deactivation_removes_window_from_listing() {
        let conn = open_memory_database().unwrap();
        let vet = Uuid::new_v4();
        let window = WorkWindow::new(vet, Weekday::Fri, t(9, 0), t(12, 0));
        insert_work_window(&conn, &window).unwrap();

        set_work_window_active(&conn, &window.id, false).unwrap();
        assert!(list_active_windows(&conn, &vet, Weekday::Fri).unwrap().is_empty());
    }

    #[test]
    fn deactivating_unknown_window_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = set_work_window_active(&conn, &Uuid::new_v4(), false).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
