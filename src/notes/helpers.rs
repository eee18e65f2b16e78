use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::internal_error::InternalResult;
use crate::listing::{query_page, Filter, Page, SortKey};

use super::data::*;

const NOTE_COLUMNS: &str = "id, text, completed, created_at, updated_at";

pub const NOTE_SORT_KEYS: &[SortKey] = &[
    SortKey {
        name: "createdAt",
        column: "created_at",
    },
    SortKey {
        name: "updatedAt",
        column: "updated_at",
    },
    SortKey {
        name: "text",
        column: "text",
    },
    SortKey {
        name: "completed",
        column: "completed",
    },
];

pub fn get_note_from_row(row: &Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        text: row.get(1)?,
        completed: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub fn get_note_from_db(note_id: NoteID, db_connection: &Connection) -> InternalResult<Note> {
    db_connection
        .query_row(
            &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
            params![note_id],
            get_note_from_row,
        )
        .optional()?
        .ok_or_else(note_not_found)
}

pub fn get_all_notes_from_db(db_connection: &Connection) -> InternalResult<Vec<Note>> {
    let mut statement =
        db_connection.prepare(&format!("SELECT {} FROM notes ORDER BY id", NOTE_COLUMNS))?;
    let notes = statement
        .query_map(params![], get_note_from_row)?
        .collect::<rusqlite::Result<Vec<Note>>>()?;

    Ok(notes)
}

pub fn get_recent_notes_from_db(limit: i64, db_connection: &Connection) -> InternalResult<Vec<Note>> {
    let mut statement = db_connection.prepare(&format!(
        "SELECT {} FROM notes ORDER BY created_at DESC, id DESC LIMIT ?1",
        NOTE_COLUMNS
    ))?;
    let notes = statement
        .query_map(params![limit], get_note_from_row)?
        .collect::<rusqlite::Result<Vec<Note>>>()?;

    Ok(notes)
}

pub fn list_notes_from_db(
    filter: &Filter,
    page: &Page,
    db_connection: &Connection,
) -> InternalResult<(Vec<Note>, i64)> {
    query_page(db_connection, "notes", NOTE_COLUMNS, filter, page, get_note_from_row)
}

pub fn add_note_to_db(note: &Note, db_connection: &Connection) -> InternalResult<NoteID> {
    db_connection.execute(
        "INSERT INTO notes (text, completed, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        params![note.text, note.completed, note.created_at, note.updated_at],
    )?;

    Ok(db_connection.last_insert_rowid())
}

pub fn update_note_in_db(note: &Note, db_connection: &Connection) -> InternalResult<()> {
    let changed = db_connection.execute(
        "UPDATE notes SET text = ?1, completed = ?2, updated_at = ?3 WHERE id = ?4",
        params![note.text, note.completed, note.updated_at, note.id],
    )?;

    if changed == 0 {
        return Err(note_not_found());
    }

    Ok(())
}

pub fn delete_note_from_db(note_id: NoteID, db_connection: &Connection) -> InternalResult<()> {
    let deleted = db_connection.execute("DELETE FROM notes WHERE id = ?1", params![note_id])?;

    if deleted == 0 {
        return Err(note_not_found());
    }

    Ok(())
}
