use chrono::Utc;
use rocket::serde::json::{self, Json};
use rocket::{delete, get, patch, post, put, routes, Route, State};

use crate::config::AppConfig;
use crate::data::DBConnection;
use crate::envelope::{Deleted, Reply};
use crate::internal_error::InternalResult;
use crate::listing::{parse_filter, Filter, ListQuery, Page, Pagination};
use crate::rate_limit::{General, RateLimited};
use crate::validation::accept;

use super::data::*;
use super::helpers::*;
use super::stats::{note_stats, NoteStats};

pub fn routes() -> Vec<Route> {
    routes![
        get_notes,
        get_note_stats,
        get_note,
        add_note,
        set_note,
        toggle_note,
        delete_note,
    ]
}

fn parse_completed(text: &str) -> Option<bool> {
    match text {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[get("/?<query..>")]
pub fn get_notes(
    query: ListQuery,
    _limit: RateLimited<General>,
    config: &State<AppConfig>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Vec<Note>>> {
    let page = Page::resolve(&query, &config.pagination, NOTE_SORT_KEYS, "createdAt", true)?;

    let mut filter = Filter::new();
    if let Some(completed) = parse_filter("completed", query.completed.as_deref(), parse_completed)? {
        filter.eq("completed", completed);
    }
    if let Some(term) = query.search_term() {
        filter.contains(&["text"], term);
    }

    let db_connection = db_connection.lock()?;
    let (notes, total) = list_notes_from_db(&filter, &page, &db_connection)?;

    Ok(Reply::ok(notes).with_pagination(Pagination::new(&page, total)))
}

#[get("/stats")]
pub fn get_note_stats(
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<NoteStats>> {
    let db_connection = db_connection.lock()?;
    let notes = get_all_notes_from_db(&db_connection)?;

    Ok(Reply::ok(note_stats(&notes, Utc::now())))
}

#[get("/<note_id>")]
pub fn get_note(
    note_id: NoteID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Note>> {
    let db_connection = db_connection.lock()?;

    Ok(Reply::ok(get_note_from_db(note_id, &db_connection)?))
}

#[post("/", data = "<note>")]
pub fn add_note(
    note: Result<Json<NoteInput>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Note>> {
    let input = accept(note)?;
    let mut note = Note::new(input, Utc::now());

    let db_connection = db_connection.lock()?;
    note.id = add_note_to_db(&note, &db_connection)?;

    Ok(Reply::created(note).with_message("Note created successfully"))
}

#[put("/<note_id>", data = "<note>")]
pub fn set_note(
    note_id: NoteID,
    note: Result<Json<NoteInput>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Note>> {
    let input = accept(note)?;

    let db_connection = db_connection.lock()?;
    let mut note = get_note_from_db(note_id, &db_connection)?;
    note.replace(input, Utc::now());
    update_note_in_db(&note, &db_connection)?;

    Ok(Reply::ok(note).with_message("Note updated successfully"))
}

#[patch("/<note_id>/toggle")]
pub fn toggle_note(
    note_id: NoteID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Note>> {
    let db_connection = db_connection.lock()?;
    let mut note = get_note_from_db(note_id, &db_connection)?;
    note.toggle(Utc::now());
    update_note_in_db(&note, &db_connection)?;

    Ok(Reply::ok(note).with_message("Note completion toggled"))
}

#[delete("/<note_id>")]
pub fn delete_note(
    note_id: NoteID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Deleted>> {
    let db_connection = db_connection.lock()?;
    delete_note_from_db(note_id, &db_connection)?;

    Ok(Reply::ok(Deleted { id: note_id }).with_message("Note deleted successfully"))
}
