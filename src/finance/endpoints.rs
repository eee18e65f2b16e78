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
use super::stats::{finance_stats, FinanceStats};

pub fn routes() -> Vec<Route> {
    routes![
        get_finance_entries,
        get_finance_stats,
        get_finance_entry,
        add_finance_entry,
        set_finance_entry,
        delete_finance_entry,
    ]
}

#[get("/?<query..>")]
pub fn get_finance_entries(
    query: ListQuery,
    _limit: RateLimited<General>,
    config: &State<AppConfig>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Vec<FinanceEntry>>> {
    let page = Page::resolve(&query, &config.pagination, FINANCE_SORT_KEYS, "date", true)?;

    let mut filter = Filter::new();
    if let Some(kind) = parse_filter("type", query.kind.as_deref(), FinanceType::parse)? {
        filter.eq("type", kind);
    }
    let method = parse_filter("paymentMethod", query.payment_method.as_deref(), PaymentMethod::parse)?;
    if let Some(method) = method {
        filter.eq("payment_method", method);
    }
    if let Some(category) = parse_filter("category", query.category.as_deref(), |text| {
        Some(text.trim().to_string())
    })? {
        filter.eq("category", category);
    }
    if let Some(period) = parse_filter("range", query.range.as_deref(), Period::parse)? {
        period.filter(&mut filter, "date", Utc::now().date_naive());
    }
    if let Some(term) = query.search_term() {
        filter.contains(&["title", "description", "category"], term);
    }

    let db_connection = db_connection.lock()?;
    let (entries, total) = list_finance_entries_from_db(&filter, &page, &db_connection)?;

    Ok(Reply::ok(entries).with_pagination(Pagination::new(&page, total)))
}

#[get("/stats")]
pub fn get_finance_stats(
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<FinanceStats>> {
    let db_connection = db_connection.lock()?;
    let entries = get_all_finance_entries_from_db(&db_connection)?;

    Ok(Reply::ok(finance_stats(&entries, Utc::now().date_naive())))
}

#[get("/<entry_id>")]
pub fn get_finance_entry(
    entry_id: FinanceEntryID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<FinanceEntry>> {
    let db_connection = db_connection.lock()?;

    Ok(Reply::ok(get_finance_entry_from_db(entry_id, &db_connection)?))
}

#[post("/", data = "<entry>")]
pub fn add_finance_entry(
    entry: Result<Json<FinanceEntryInput>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<FinanceEntry>> {
    let input = accept(entry)?;
    let mut entry = FinanceEntry::new(input, Utc::now());

    let db_connection = db_connection.lock()?;
    entry.id = add_finance_entry_to_db(&entry, &db_connection)?;

    Ok(Reply::created(entry).with_message("Finance entry created successfully"))
}

#[put("/<entry_id>", data = "<entry>")]
pub fn set_finance_entry(
    entry_id: FinanceEntryID,
    entry: Result<Json<FinanceEntryInput>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<FinanceEntry>> {
    let input = accept(entry)?;

    let db_connection = db_connection.lock()?;
    let mut entry = get_finance_entry_from_db(entry_id, &db_connection)?;
    entry.replace(input, Utc::now());
    update_finance_entry_in_db(&entry, &db_connection)?;

    Ok(Reply::ok(entry).with_message("Finance entry updated successfully"))
}

#[delete("/<entry_id>")]
pub fn delete_finance_entry(
    entry_id: FinanceEntryID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Deleted>> {
    let db_connection = db_connection.lock()?;
    delete_finance_entry_from_db(entry_id, &db_connection)?;

    Ok(Reply::ok(Deleted { id: entry_id }).with_message("Finance entry deleted successfully"))
}
