//! Cross-collection summary shown on the landing page.

use chrono::{DateTime, NaiveDate, Utc};
use rocket::{get, routes, Route, State};
use serde::Serialize;

use crate::data::DBConnection;
use crate::envelope::Reply;
use crate::finance::data::{FinanceEntry, FinanceType};
use crate::finance::helpers::{get_all_finance_entries_from_db, get_recent_finance_entries_from_db};
use crate::finance::stats::cents;
use crate::goals::data::{Goal, GoalStatus};
use crate::goals::helpers::get_all_goals_from_db;
use crate::health::data::HealthEntry;
use crate::health::helpers::{get_all_health_entries_from_db, get_recent_health_entries_from_db};
use crate::health::stats::health_stats;
use crate::internal_error::InternalResult;
use crate::notes::data::Note;
use crate::notes::helpers::{get_all_notes_from_db, get_recent_notes_from_db};
use crate::notes::stats::note_stats;
use crate::rate_limit::{General, RateLimited};
use crate::tasks::data::Task;
use crate::tasks::helpers::{get_all_tasks_from_db, get_recent_tasks_from_db};

const RECENT_TASKS: i64 = 3;
const RECENT_NOTES: i64 = 2;
const RECENT_HEALTH_ENTRIES: i64 = 2;
const RECENT_FINANCE_ENTRIES: i64 = 1;
const MAX_ACTIVITY: usize = 8;

const NOTE_TITLE_CHARS: usize = 30;

pub fn routes() -> Vec<Route> {
    routes![get_dashboard]
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GoalSummary {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HealthSummary {
    pub workouts: usize,
    pub calories: i64,
    pub streak: u32,
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct FinanceSummary {
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoteSummary {
    pub total: usize,
    pub recent: usize,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Task,
    Note,
    Health,
    Finance,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub tasks: TaskSummary,
    pub goals: GoalSummary,
    pub health: HealthSummary,
    pub finance: FinanceSummary,
    pub notes: NoteSummary,
    pub recent_activity: Vec<Activity>,
}

pub fn summarize_tasks(tasks: &[Task], today: NaiveDate) -> TaskSummary {
    let completed = tasks.iter().filter(|task| task.completed).count();
    TaskSummary {
        total: tasks.len(),
        completed,
        pending: tasks.len() - completed,
        overdue: tasks.iter().filter(|task| task.is_overdue(today)).count(),
    }
}

pub fn summarize_goals(goals: &[Goal]) -> GoalSummary {
    let count = |status: GoalStatus| goals.iter().filter(|goal| goal.status == status).count();
    GoalSummary {
        total: goals.len(),
        completed: count(GoalStatus::Completed),
        in_progress: count(GoalStatus::InProgress),
    }
}

pub fn summarize_finance(entries: &[FinanceEntry]) -> FinanceSummary {
    let total = |kind: FinanceType| {
        entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.amount)
            .sum::<f64>()
    };
    let income = total(FinanceType::Income);
    let expenses = total(FinanceType::Expense);

    FinanceSummary {
        income: cents(income),
        expenses: cents(expenses),
        balance: cents(income - expenses),
    }
}

fn task_activity(task: &Task) -> Activity {
    let description = if task.completed {
        "Task completed"
    } else {
        "Task added"
    };
    Activity {
        id: format!("task-{}", task.id),
        kind: ActivityKind::Task,
        title: task.title.clone(),
        description: description.to_string(),
        timestamp: task.created_at,
    }
}

fn note_activity(note: &Note) -> Activity {
    let mut title: String = note.text.chars().take(NOTE_TITLE_CHARS).collect();
    if note.text.chars().count() > NOTE_TITLE_CHARS {
        title.push_str("...");
    }
    Activity {
        id: format!("note-{}", note.id),
        kind: ActivityKind::Note,
        title,
        description: String::from("Note added"),
        timestamp: note.created_at,
    }
}

fn health_activity(entry: &HealthEntry) -> Activity {
    let description = if entry.description.is_empty() {
        String::from("Health entry added")
    } else {
        entry.description.clone()
    };
    Activity {
        id: format!("health-{}", entry.id),
        kind: ActivityKind::Health,
        title: format!("{} logged", entry.kind),
        description,
        timestamp: entry.created_at,
    }
}

fn finance_activity(entry: &FinanceEntry) -> Activity {
    Activity {
        id: format!("finance-{}", entry.id),
        kind: ActivityKind::Finance,
        title: entry.title.clone(),
        description: format!("{} of {:.2}", entry.kind, entry.amount),
        timestamp: entry.created_at,
    }
}

/// Merges the latest records of each collection, newest first.
pub fn recent_activity(
    tasks: &[Task],
    notes: &[Note],
    health: &[HealthEntry],
    finance: &[FinanceEntry],
) -> Vec<Activity> {
    let mut activity: Vec<Activity> = tasks
        .iter()
        .map(task_activity)
        .chain(notes.iter().map(note_activity))
        .chain(health.iter().map(health_activity))
        .chain(finance.iter().map(finance_activity))
        .collect();

    activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    activity.truncate(MAX_ACTIVITY);
    activity
}

#[get("/dashboard")]
pub fn get_dashboard(
    _limit: RateLimited<General>,
    db_connection: &State<DBConnection>,
) -> InternalResult<Reply<Dashboard>> {
    let now = Utc::now();
    let today = now.date_naive();
    let db_connection = db_connection.lock()?;

    let tasks = get_all_tasks_from_db(&db_connection)?;
    let goals = get_all_goals_from_db(&db_connection)?;
    let health = health_stats(&get_all_health_entries_from_db(&db_connection)?, today);
    let finance = get_all_finance_entries_from_db(&db_connection)?;
    let notes = note_stats(&get_all_notes_from_db(&db_connection)?, now);

    let recent_activity = recent_activity(
        &get_recent_tasks_from_db(RECENT_TASKS, &db_connection)?,
        &get_recent_notes_from_db(RECENT_NOTES, &db_connection)?,
        &get_recent_health_entries_from_db(RECENT_HEALTH_ENTRIES, &db_connection)?,
        &get_recent_finance_entries_from_db(RECENT_FINANCE_ENTRIES, &db_connection)?,
    );

    Ok(Reply::ok(Dashboard {
        tasks: summarize_tasks(&tasks, today),
        goals: summarize_goals(&goals),
        health: HealthSummary {
            workouts: health.workouts,
            calories: health.total_calories,
            streak: health.workout_streak,
        },
        finance: summarize_finance(&finance),
        notes: NoteSummary {
            total: notes.total,
            recent: notes.recent,
        },
        recent_activity,
    }))
}
