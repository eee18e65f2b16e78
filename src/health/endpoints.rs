use chrono::Utc;
use rocket::serde::json::{self, Json};
use rocket::{delete, get, post, put, routes, Route, State};

use crate::config::AppConfig;
use crate::data::DBConnection;
use crate::envelope::{Deleted, Reply};
use crate::internal_error::InternalResult;
use crate::listing::{parse_filter, Filter, ListQuery, Page, Pagination, Period};
use crate::rate_limit::{General, RateLimited};
use crate::validation::accept;

use super::data::*;
use super::helpers::*;
use super::stats::{health_stats, HealthStats};

pub fn routes() -> Vec<Route> {
    routes![
        get_health_entries,
        get_health_stats,
        get_health_entry,
        add_health_entry,
        set_health_entry,
        delete_health_entry,
    ]
}

#[get("/?<query..>")]
pub fn get_health_entries(
    query: ListQuery,
    _limit: RateLimited<General>,
    config: &State<AppConfig>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Vec<HealthEntry>>> {
    let page = Page::resolve(&query, &config.pagination, HEALTH_SORT_KEYS, "date", true)?;

    let mut filter = Filter::new();
    if let Some(kind) = parse_filter("type", query.kind.as_deref(), HealthType::parse)? {
        filter.eq("type", kind);
    }
    // Quarters are a finance-only range.
    let period = parse_filter("range", query.range.as_deref(), |text| {
        Period::parse(text).filter(|period| *period != Period::Quarter)
    })?;
    if let Some(period) = period {
        period.filter(&mut filter, "date", Utc::now().date_naive());
    }
    if let Some(term) = query.search_term() {
        filter.contains(&["title", "description"], term);
    }

    let db_connection = db_connection.lock()?;
    let (entries, total) = list_health_entries_from_db(&filter, &page, &db_connection)?;

    Ok(Reply::ok(entries).with_pagination(Pagination::new(&page, total)))
}

#[get("/stats")]
pub fn get_health_stats(
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<HealthStats>> {
    let db_connection = db_connection.lock()?;
    let entries = get_all_health_entries_from_db(&db_connection)?;

    Ok(Reply::ok(health_stats(&entries, Utc::now().date_naive())))
}

#[get("/<entry_id>")]
pub fn get_health_entry(
    entry_id: HealthEntryID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<HealthEntry>> {
    let db_connection = db_connection.lock()?;

    Ok(Reply::ok(get_health_entry_from_db(entry_id, &db_connection)?))
}

#[post("/", data = "<entry>")]
pub fn add_health_entry(
    entry: Result<Json<HealthEntryInput>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<HealthEntry>> {
    let input = accept(entry)?;
    let mut entry = HealthEntry::new(input, Utc::now());

    let db_connection = db_connection.lock()?;
    entry.id = add_health_entry_to_db(&entry, &db_connection)?;

    Ok(Reply::created(entry).with_message("Health entry created successfully"))
}

#[put("/<entry_id>", data = "<entry>")]
pub fn set_health_entry(
    entry_id: HealthEntryID,
    entry: Result<Json<HealthEntryInput>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<HealthEntry>> {
    let input = accept(entry)?;

    let db_connection = db_connection.lock()?;
    let mut entry = get_health_entry_from_db(entry_id, &db_connection)?;
    entry.replace(input, Utc::now());
    update_health_entry_in_db(&entry, &db_connection)?;

    Ok(Reply::ok(entry).with_message("Health entry updated successfully"))
}

#[delete("/<entry_id>")]
pub fn delete_health_entry(
    entry_id: HealthEntryID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Deleted>> {
    let db_connection = db_connection.lock()?;
    delete_health_entry_from_db(entry_id, &db_connection)?;

    Ok(Reply::ok(Deleted { id: entry_id }).with_message("Health entry deleted successfully"))
}
