use chrono::Utc;
use rocket::serde::json::{self, Json};
use rocket::{delete, get, patch, post, put, routes, Route, State};

use crate::config::AppConfig;
use crate::data::{DBConnection, Priority};
use crate::envelope::{Deleted, Reply};
use crate::internal_error::InternalResult;
use crate::listing::{parse_filter, Filter, ListQuery, Page, Pagination};
use crate::rate_limit::{General, RateLimited};
use crate::validation::{accept, parse_body, ProgressChange, StatusChange};

use super::data::*;
use super::helpers::*;
use super::stats::{goal_stats, GoalStats};

pub fn routes() -> Vec<Route> {
    routes![
        get_goals,
        get_goal_stats,
        get_goal,
        add_goal,
        set_goal,
        set_goal_progress,
        set_goal_status,
        add_milestone,
        toggle_milestone,
        delete_milestone,
        delete_goal,
    ]
}

#[get("/?<query..>")]
pub fn get_goals(
    query: ListQuery,
    _limit: RateLimited<General>,
    config: &State<AppConfig>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Vec<Goal>>> {
    let page = Page::resolve(&query, &config.pagination, GOAL_SORT_KEYS, "createdAt", true)?;

    let mut filter = Filter::new();
    if let Some(status) = parse_filter("status", query.status.as_deref(), GoalStatus::parse)? {
        filter.eq("status", status);
    }
    if let Some(category) = parse_filter("category", query.category.as_deref(), |c| {
        Some(c.trim().to_string())
    })? {
        filter.eq("category", category);
    }
    if let Some(priority) = parse_filter("priority", query.priority.as_deref(), Priority::parse)? {
        filter.eq("priority", priority);
    }
    if let Some(term) = query.search_term() {
        filter.contains(&["title", "description"], term);
    }

    let db_connection = db_connection.lock()?;
    let (goals, total) = list_goals_from_db(&filter, &page, &db_connection)?;

    Ok(Reply::ok(goals).with_pagination(Pagination::new(&page, total)))
}

#[get("/stats")]
pub fn get_goal_stats(
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<GoalStats>> {
    let db_connection = db_connection.lock()?;
    let goals = get_all_goals_from_db(&db_connection)?;

    Ok(Reply::ok(goal_stats(&goals, Utc::now().date_naive())))
}

#[get("/<goal_id>")]
pub fn get_goal(
    goal_id: GoalID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Goal>> {
    let db_connection = db_connection.lock()?;

    Ok(Reply::ok(get_goal_from_db(goal_id, &db_connection)?))
}

#[post("/", data = "<goal>")]
pub fn add_goal(
    goal: Result<Json<GoalInput>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Goal>> {
    let input = accept(goal)?;
    let mut goal = Goal::new(input, Utc::now());

    let mut db_connection = db_connection.lock()?;
    goal.id = add_goal_to_db(&goal, &mut db_connection)?;

    Ok(Reply::created(goal).with_message("Goal created successfully"))
}

#[put("/<goal_id>", data = "<goal>")]
pub fn set_goal(
    goal_id: GoalID,
    goal: Result<Json<GoalInput>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Goal>> {
    let input = accept(goal)?;

    let mut db_connection = db_connection.lock()?;
    let mut goal = get_goal_from_db(goal_id, &db_connection)?;
    goal.replace(input, Utc::now());
    update_goal_in_db(&goal, &mut db_connection)?;

    Ok(Reply::ok(goal).with_message("Goal updated successfully"))
}

#[patch("/<goal_id>/progress", data = "<change>")]
pub fn set_goal_progress(
    goal_id: GoalID,
    change: Result<Json<ProgressChange>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Goal>> {
    let progress = parse_body(change)?.clamped()?;

    let mut db_connection = db_connection.lock()?;
    let mut goal = get_goal_from_db(goal_id, &db_connection)?;
    goal.set_progress(progress, Utc::now());
    update_goal_in_db(&goal, &mut db_connection)?;

    Ok(Reply::ok(goal).with_message("Goal progress updated successfully"))
}

#[patch("/<goal_id>/status", data = "<change>")]
pub fn set_goal_status(
    goal_id: GoalID,
    change: Result<Json<StatusChange>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Goal>> {
    let status = parse_body(change)?.parse_with(GoalStatus::parse)?;

    let mut db_connection = db_connection.lock()?;
    let mut goal = get_goal_from_db(goal_id, &db_connection)?;
    goal.set_status(status, Utc::now());
    update_goal_in_db(&goal, &mut db_connection)?;

    Ok(Reply::ok(goal).with_message("Goal status updated successfully"))
}

#[post("/<goal_id>/milestones", data = "<milestone>")]
pub fn add_milestone(
    goal_id: GoalID,
    milestone: Result<Json<NewMilestone>, json::Error<'_>>,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Goal>> {
    let milestone = accept(milestone)?;

    let mut db_connection = db_connection.lock()?;
    let mut goal = get_goal_from_db(goal_id, &db_connection)?;
    goal.add_milestone(milestone.text, Utc::now());
    update_goal_in_db(&goal, &mut db_connection)?;

    Ok(Reply::created(goal).with_message("Milestone added successfully"))
}

#[patch("/<goal_id>/milestones/<index>/toggle")]
pub fn toggle_milestone(
    goal_id: GoalID,
    index: usize,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Goal>> {
    let mut db_connection = db_connection.lock()?;
    let mut goal = get_goal_from_db(goal_id, &db_connection)?;
    goal.toggle_milestone(index, Utc::now())?;
    update_goal_in_db(&goal, &mut db_connection)?;

    Ok(Reply::ok(goal).with_message("Milestone toggled"))
}

#[delete("/<goal_id>/milestones/<index>")]
pub fn delete_milestone(
    goal_id: GoalID,
    index: usize,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Goal>> {
    let mut db_connection = db_connection.lock()?;
    let mut goal = get_goal_from_db(goal_id, &db_connection)?;
    goal.remove_milestone(index, Utc::now())?;
    update_goal_in_db(&goal, &mut db_connection)?;

    Ok(Reply::ok(goal).with_message("Milestone deleted successfully"))
}

#[delete("/<goal_id>")]
pub fn delete_goal(
    goal_id: GoalID,
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Deleted>> {
    let mut db_connection = db_connection.lock()?;
    delete_goal_from_db(goal_id, &mut db_connection)?;

    Ok(Reply::ok(Deleted { id: goal_id }).with_message("Goal deleted successfully"))
}
