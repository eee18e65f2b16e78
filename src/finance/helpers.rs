use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::internal_error::InternalResult;
use crate::listing::{query_page, Filter, Page, SortKey};

use super::data::*;

const FINANCE_COLUMNS: &str =
    "id, type, title, description, amount, category, payment_method, date, created_at";

pub const FINANCE_SORT_KEYS: &[SortKey] = &[
    SortKey {
        name: "date",
        column: "date",
    },
    SortKey {
        name: "createdAt",
        column: "created_at",
    },
    SortKey {
        name: "amount",
        column: "amount",
    },
    SortKey {
        name: "title",
        column: "title",
    },
    SortKey {
        name: "category",
        column: "category",
    },
];

pub fn get_finance_entry_from_row(row: &Row) -> rusqlite::Result<FinanceEntry> {
    Ok(FinanceEntry {
        id: row.get(0)?,
        kind: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        category: row.get(5)?,
        payment_method: row.get(6)?,
        date: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub fn get_finance_entry_from_db(
    entry_id: FinanceEntryID,
    db_connection: &Connection,
) -> InternalResult<FinanceEntry> {
    db_connection
        .query_row(
            &format!("SELECT {} FROM finance_entries WHERE id = ?1", FINANCE_COLUMNS),
            params![entry_id],
            get_finance_entry_from_row,
        )
        .optional()?
        .ok_or_else(finance_entry_not_found)
}

pub fn get_all_finance_entries_from_db(db_connection: &Connection) -> InternalResult<Vec<FinanceEntry>> {
    let mut statement = db_connection.prepare(&format!(
        "SELECT {} FROM finance_entries ORDER BY date, id",
        FINANCE_COLUMNS
    ))?;
    let entries = statement
        .query_map(params![], get_finance_entry_from_row)?
        .collect::<rusqlite::Result<Vec<FinanceEntry>>>()?;

    Ok(entries)
}

pub fn get_recent_finance_entries_from_db(
    limit: i64,
    db_connection: &Connection,
) -> InternalResult<Vec<FinanceEntry>> {
    let mut statement = db_connection.prepare(&format!(
        "SELECT {} FROM finance_entries ORDER BY created_at DESC, id DESC LIMIT ?1",
        FINANCE_COLUMNS
    ))?;
    let entries = statement
        .query_map(params![limit], get_finance_entry_from_row)?
        .collect::<rusqlite::Result<Vec<FinanceEntry>>>()?;

    Ok(entries)
}

pub fn list_finance_entries_from_db(
    filter: &Filter,
    page: &Page,
    db_connection: &Connection,
) -> InternalResult<(Vec<FinanceEntry>, i64)> {
    query_page(
        db_connection,
        "finance_entries",
        FINANCE_COLUMNS,
        filter,
        page,
        get_finance_entry_from_row,
    )
}

pub fn add_finance_entry_to_db(
    entry: &FinanceEntry,
    db_connection: &Connection,
) -> InternalResult<FinanceEntryID> {
    db_connection.execute(
        "INSERT INTO finance_entries (type, title, description, amount, category, payment_method, \
         date, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.kind,
            entry.title,
            entry.description,
            entry.amount,
            entry.category,
            entry.payment_method,
            entry.date,
            entry.created_at,
        ],
    )?;

    Ok(db_connection.last_insert_rowid())
}

pub fn update_finance_entry_in_db(entry: &FinanceEntry, db_connection: &Connection) -> InternalResult<()> {
    let changed = db_connection.execute(
        "UPDATE finance_entries SET type = ?1, title = ?2, description = ?3, amount = ?4, \
         category = ?5, payment_method = ?6, date = ?7 WHERE id = ?8",
        params![
            entry.kind,
            entry.title,
            entry.description,
            entry.amount,
            entry.category,
            entry.payment_method,
            entry.date,
            entry.id,
        ],
    )?;

    if changed == 0 {
        return Err(finance_entry_not_found());
    }

    Ok(())
}

pub fn delete_finance_entry_from_db(
    entry_id: FinanceEntryID,
    db_connection: &Connection,
) -> InternalResult<()> {
    let deleted = db_connection.execute("DELETE FROM finance_entries WHERE id = ?1", params![entry_id])?;

    if deleted == 0 {
        return Err(finance_entry_not_found());
    }

    Ok(())
}
