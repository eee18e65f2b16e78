use chrono::Utc;
use rocket::serde::json::{self, Json};
use rocket::{delete, get, patch, post, put, routes, Route, State};

use crate::config::AppConfig;
use crate::data::{DBConnection, Priority};
use crate::envelope::{Deleted, Reply};
use crate::internal_error::{InternalError, InternalResult};
use crate::listing::{parse_filter, Filter, ListQuery, Page, Pagination};
use crate::rate_limit::{General, RateLimited, Search};
use crate::validation::{accept, parse_body, ProgressChange, StatusChange};

use super::data::*;
use super::helpers::*;
use super::stats::{task_stats, TaskStats};

pub fn routes() -> Vec<Route> {
    routes![
        get_tasks,
        search_tasks,
        get_task_stats,
        get_task,
        add_task,
        set_task,
        toggle_task,
        set_task_status,
        set_task_progress,
        delete_task,
    ]
}

#[get("/?<query..>")]
pub fn get_tasks(
    query: ListQuery,
    _limit: RateLimited<General>,
    config: &State<AppConfig>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Vec<Task>>> {
    let page = Page::resolve(&query, &config.pagination, TASK_SORT_KEYS, "dueDate", false)?;

    let mut filter = Filter::new();
    if let Some(status) = parse_filter("status", query.status.as_deref(), TaskStatus::parse)? {
        filter.eq("status", status);
    }
    if let Some(priority) = parse_filter("priority", query.priority.as_deref(), Priority::parse)? {
        filter.eq("priority", priority);
    }
    if let Some(category) = parse_filter("category", query.category.as_deref(), |c| {
        Some(c.trim().to_string())
    })? {
        filter.eq("category", category);
    }
    if let Some(window) = parse_filter("due", query.due.as_deref(), DueWindow::parse)? {
        due_window_filter(&mut filter, window, Utc::now().date_naive());
    }
    if let Some(term) = query.search_term() {
        search_filter(&mut filter, term);
    }

    let db_connection = db_connection.lock()?;
    let (tasks, total) = list_tasks_from_db(&filter, &page, &db_connection)?;

    Ok(Reply::ok(tasks).with_pagination(Pagination::new(&page, total)))
}

#[get("/search?<query..>")]
pub fn search_tasks(
    query: ListQuery,
    _limit: RateLimited<General>,
    _search_limit: RateLimited<Search>,
    config: &State<AppConfig>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Vec<Task>>> {
    let term = match query.search_term() {
        Some(term) if term.chars().count() >= 2 => term,
        _ => {
            return Err(InternalError::rule(
                "INVALID_SEARCH_QUERY",
                "Search query must be at least 2 characters long",
            ))
        }
    };

    // Search results are always newest update first.
    let paging = ListQuery {
        page: query.page,
        limit: query.limit,
        ..ListQuery::default()
    };
    let page = Page::resolve(&paging, &config.pagination, TASK_SORT_KEYS, "updatedAt", true)?;

    let mut filter = Filter::new();
    search_filter(&mut filter, term);

    let db_connection = db_connection.lock()?;
    let (tasks, total) = list_tasks_from_db(&filter, &page, &db_connection)?;

    Ok(Reply::ok(tasks).with_pagination(Pagination::new(&page, total)))
}

#[get("/stats")]
pub fn get_task_stats(
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<TaskStats>> {
    let db_connection = db_connection.lock()?;
    let tasks = get_all_tasks_from_db(&db_connection)?;

    Ok(Reply::ok(task_stats(&tasks, Utc::now().date_naive())))
}

#[get("/<task_id>")]
pub fn get_task(
    task_id: TaskID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Task>> {
    let db_connection = db_connection.lock()?;

    Ok(Reply::ok(get_task_from_db(task_id, &db_connection)?))
}

#[post("/", data = "<task>")]
pub fn add_task(
    task: Result<Json<TaskInput>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Task>> {
    let input = accept(task)?;
    let mut task = Task::new(input, Utc::now());

    let mut db_connection = db_connection.lock()?;
    task.id = add_task_to_db(&task, &mut db_connection)?;

    Ok(Reply::created(task).with_message("Task created successfully"))
}

#[put("/<task_id>", data = "<task>")]
pub fn set_task(
    task_id: TaskID,
    task: Result<Json<TaskInput>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Task>> {
    let input = accept(task)?;

    let mut db_connection = db_connection.lock()?;
    let mut task = get_task_from_db(task_id, &db_connection)?;
    task.replace(input, Utc::now());
    update_task_in_db(&task, &mut db_connection)?;

    Ok(Reply::ok(task).with_message("Task updated successfully"))
}

#[patch("/<task_id>/toggle")]
pub fn toggle_task(
    task_id: TaskID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Task>> {
    let mut db_connection = db_connection.lock()?;
    let mut task = get_task_from_db(task_id, &db_connection)?;
    task.toggle(Utc::now());
    update_task_in_db(&task, &mut db_connection)?;

    Ok(Reply::ok(task).with_message("Task completion toggled"))
}

#[patch("/<task_id>/status", data = "<change>")]
pub fn set_task_status(
    task_id: TaskID,
    change: Result<Json<StatusChange>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Task>> {
    let status = parse_body(change)?.parse_with(TaskStatus::parse)?;

    let mut db_connection = db_connection.lock()?;
    let mut task = get_task_from_db(task_id, &db_connection)?;
    task.set_status(status, Utc::now());
    update_task_in_db(&task, &mut db_connection)?;

    Ok(Reply::ok(task).with_message("Task status updated successfully"))
}

#[patch("/<task_id>/progress", data = "<change>")]
pub fn set_task_progress(
    task_id: TaskID,
    change: Result<Json<ProgressChange>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Task>> {
    let progress = parse_body(change)?.bounded()?.round() as i64;

    let mut db_connection = db_connection.lock()?;
    let mut task = get_task_from_db(task_id, &db_connection)?;
    task.set_progress(progress, Utc::now());
    update_task_in_db(&task, &mut db_connection)?;

    Ok(Reply::ok(task).with_message("Task progress updated successfully"))
}

#[delete("/<task_id>")]
pub fn delete_task(
    task_id: TaskID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Deleted>> {
    let mut db_connection = db_connection.lock()?;
    delete_task_from_db(task_id, &mut db_connection)?;

    Ok(Reply::ok(Deleted { id: task_id }).with_message("Task deleted successfully"))
}
