use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::internal_error::InternalResult;
use crate::listing::{query_page, Filter, Page, SortKey};

use super::data::*;

const HEALTH_COLUMNS: &str =
    "id, type, title, description, date, duration, calories, weight, water, created_at";

pub const HEALTH_SORT_KEYS: &[SortKey] = &[
    SortKey {
        name: "date",
        column: "date",
    },
    SortKey {
        name: "createdAt",
        column: "created_at",
    },
    SortKey {
        name: "title",
        column: "title",
    },
    SortKey {
        name: "type",
        column: "type",
    },
    SortKey {
        name: "duration",
        column: "duration",
    },
    SortKey {
        name: "calories",
        column: "calories",
    },
];

pub fn get_health_entry_from_row(row: &Row) -> rusqlite::Result<HealthEntry> {
    Ok(HealthEntry {
        id: row.get(0)?,
        kind: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        date: row.get(4)?,
        duration: row.get(5)?,
        calories: row.get(6)?,
        weight: row.get(7)?,
        water: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub fn get_health_entry_from_db(
    entry_id: HealthEntryID,
    db_connection: &Connection,
) -> InternalResult<HealthEntry> {
    db_connection
        .query_row(
            &format!("SELECT {} FROM health_entries WHERE id = ?1", HEALTH_COLUMNS),
            params![entry_id],
            get_health_entry_from_row,
        )
        .optional()?
        .ok_or_else(health_entry_not_found)
}

pub fn get_all_health_entries_from_db(db_connection: &Connection) -> InternalResult<Vec<HealthEntry>> {
    let mut statement = db_connection.prepare(&format!(
        "SELECT {} FROM health_entries ORDER BY date, id",
        HEALTH_COLUMNS
    ))?;
    let entries = statement
        .query_map(params![], get_health_entry_from_row)?
        .collect::<rusqlite::Result<Vec<HealthEntry>>>()?;

    Ok(entries)
}

pub fn get_recent_health_entries_from_db(
    limit: i64,
    db_connection: &Connection,
) -> InternalResult<Vec<HealthEntry>> {
    let mut statement = db_connection.prepare(&format!(
        "SELECT {} FROM health_entries ORDER BY created_at DESC, id DESC LIMIT ?1",
        HEALTH_COLUMNS
    ))?;
    let entries = statement
        .query_map(params![limit], get_health_entry_from_row)?
        .collect::<rusqlite::Result<Vec<HealthEntry>>>()?;

    Ok(entries)
}

pub fn list_health_entries_from_db(
    filter: &Filter,
    page: &Page,
    db_connection: &Connection,
) -> InternalResult<(Vec<HealthEntry>, i64)> {
    query_page(
        db_connection,
        "health_entries",
        HEALTH_COLUMNS,
        filter,
        page,
        get_health_entry_from_row,
    )
}

pub fn add_health_entry_to_db(entry: &HealthEntry, db_connection: &Connection) -> InternalResult<HealthEntryID> {
    db_connection.execute(
        "INSERT INTO health_entries (type, title, description, date, duration, calories, weight, \
         water, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.kind,
            entry.title,
            entry.description,
            entry.date,
            entry.duration,
            entry.calories,
            entry.weight,
            entry.water,
            entry.created_at,
        ],
    )?;

    Ok(db_connection.last_insert_rowid())
}

pub fn update_health_entry_in_db(entry: &HealthEntry, db_connection: &Connection) -> InternalResult<()> {
    let changed = db_connection.execute(
        "UPDATE health_entries SET type = ?1, title = ?2, description = ?3, date = ?4, \
         duration = ?5, calories = ?6, weight = ?7, water = ?8 WHERE id = ?9",
        params![
            entry.kind,
            entry.title,
            entry.description,
            entry.date,
            entry.duration,
            entry.calories,
            entry.weight,
            entry.water,
            entry.id,
        ],
    )?;

    if changed == 0 {
        return Err(health_entry_not_found());
    }

    Ok(())
}

pub fn delete_health_entry_from_db(entry_id: HealthEntryID, db_connection: &Connection) -> InternalResult<()> {
    let deleted = db_connection.execute("DELETE FROM health_entries WHERE id = ?1", params![entry_id])?;

    if deleted == 0 {
        return Err(health_entry_not_found());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{open_database, IN_MEMORY_DATABASE};
    use chrono::{TimeZone, Utc};

    #[test]
    fn optional_measurements_survive_storage() {
        let db_connection = open_database(IN_MEMORY_DATABASE).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 7, 0, 0).unwrap();
        let input: HealthEntryInput =
            serde_json::from_str(r#"{"type":"weight","title":"Weigh-in","weight":71.4}"#).unwrap();

        let mut entry = HealthEntry::new(input, now);
        entry.id = add_health_entry_to_db(&entry, &db_connection).unwrap();

        let stored = get_health_entry_from_db(entry.id, &db_connection).unwrap();
        assert_eq!(stored, entry);
        assert_eq!(stored.duration, None);
        assert_eq!(stored.weight, Some(71.4));
    }

    #[test]
    fn updating_a_missing_entry_fails() {
        let db_connection = open_database(IN_MEMORY_DATABASE).unwrap();
        let input: HealthEntryInput = serde_json::from_str(r#"{"type":"diet","title":"Snack"}"#).unwrap();
        let mut entry = HealthEntry::new(input, Utc::now());
        entry.id = 99;

        assert!(update_health_entry_in_db(&entry, &db_connection).is_err());
        assert!(delete_health_entry_from_db(99, &db_connection).is_err());
    }
}
