use rusqlite::{params, Connection, OptionalExtension, Row};

use std::collections::HashMap;

use crate::internal_error::InternalResult;
use crate::listing::{query_page, Filter, Page, SortKey};

use super::data::*;

const GOAL_COLUMNS: &str = "id, title, description, category, priority, progress, target_date, \
                            status, created_at, updated_at, completed_at";

pub const GOAL_SORT_KEYS: &[SortKey] = &[
    SortKey {
        name: "createdAt",
        column: "created_at",
    },
    SortKey {
        name: "updatedAt",
        column: "updated_at",
    },
    SortKey {
        name: "targetDate",
        column: "target_date",
    },
    SortKey {
        name: "title",
        column: "title",
    },
    SortKey {
        name: "progress",
        column: "progress",
    },
    SortKey {
        name: "priority",
        column: "CASE priority WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END",
    },
    SortKey {
        name: "status",
        column: "status",
    },
];

/// Milestones are filled in separately from `goal_milestones`.
pub fn get_goal_from_row(row: &Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        priority: row.get(4)?,
        progress: row.get(5)?,
        milestones: vec![],
        target_date: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        completed_at: row.get(10)?,
    })
}

pub fn get_milestones_from_db(goal_id: GoalID, db_connection: &Connection) -> InternalResult<Vec<Milestone>> {
    let mut statement = db_connection
        .prepare("SELECT text, completed FROM goal_milestones WHERE goal_id = ?1 ORDER BY num")?;
    let milestones = statement
        .query_map(params![goal_id], |row| {
            Ok(Milestone {
                text: row.get(0)?,
                completed: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<Milestone>>>()?;

    Ok(milestones)
}

fn get_milestone_map_from_db(db_connection: &Connection) -> InternalResult<HashMap<GoalID, Vec<Milestone>>> {
    let mut milestone_map: HashMap<GoalID, Vec<Milestone>> = HashMap::new();

    let mut statement = db_connection
        .prepare("SELECT goal_id, text, completed FROM goal_milestones ORDER BY goal_id, num")?;
    let mut rows = statement.query(params![])?;
    while let Some(row) = rows.next()? {
        let goal_id: GoalID = row.get(0)?;
        milestone_map.entry(goal_id).or_default().push(Milestone {
            text: row.get(1)?,
            completed: row.get(2)?,
        });
    }

    Ok(milestone_map)
}

pub fn get_goal_from_db(goal_id: GoalID, db_connection: &Connection) -> InternalResult<Goal> {
    let mut goal = db_connection
        .query_row(
            &format!("SELECT {} FROM goals WHERE id = ?1", GOAL_COLUMNS),
            params![goal_id],
            get_goal_from_row,
        )
        .optional()?
        .ok_or_else(goal_not_found)?;
    goal.milestones = get_milestones_from_db(goal_id, db_connection)?;

    Ok(goal)
}

pub fn get_all_goals_from_db(db_connection: &Connection) -> InternalResult<Vec<Goal>> {
    let mut milestone_map = get_milestone_map_from_db(db_connection)?;

    let mut statement =
        db_connection.prepare(&format!("SELECT {} FROM goals ORDER BY id", GOAL_COLUMNS))?;
    let mut goals = statement
        .query_map(params![], get_goal_from_row)?
        .collect::<rusqlite::Result<Vec<Goal>>>()?;

    for goal in goals.iter_mut() {
        goal.milestones = milestone_map.remove(&goal.id).unwrap_or_default();
    }

    Ok(goals)
}

pub fn list_goals_from_db(
    filter: &Filter,
    page: &Page,
    db_connection: &Connection,
) -> InternalResult<(Vec<Goal>, i64)> {
    let (mut goals, total) =
        query_page(db_connection, "goals", GOAL_COLUMNS, filter, page, get_goal_from_row)?;

    for goal in goals.iter_mut() {
        goal.milestones = get_milestones_from_db(goal.id, db_connection)?;
    }

    Ok((goals, total))
}

fn add_milestones_to_db(
    goal_id: GoalID,
    milestones: &[Milestone],
    db_connection: &Connection,
) -> InternalResult<()> {
    let mut statement = db_connection.prepare(
        "INSERT INTO goal_milestones (goal_id, num, text, completed) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (num, milestone) in milestones.iter().enumerate() {
        statement.execute(params![goal_id, num as i64, milestone.text, milestone.completed])?;
    }

    Ok(())
}

fn delete_milestones_from_db(goal_id: GoalID, db_connection: &Connection) -> InternalResult<()> {
    db_connection.execute("DELETE FROM goal_milestones WHERE goal_id = ?1", params![goal_id])?;

    Ok(())
}

pub fn add_goal_to_db(goal: &Goal, db_connection: &mut Connection) -> InternalResult<GoalID> {
    let transaction = db_connection.transaction()?;

    transaction.execute(
        "INSERT INTO goals (title, description, category, priority, progress, target_date, status, \
         created_at, updated_at, completed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            goal.title,
            goal.description,
            goal.category,
            goal.priority,
            goal.progress,
            goal.target_date,
            goal.status,
            goal.created_at,
            goal.updated_at,
            goal.completed_at,
        ],
    )?;
    let goal_id = transaction.last_insert_rowid();
    add_milestones_to_db(goal_id, &goal.milestones, &transaction)?;

    transaction.commit()?;

    Ok(goal_id)
}

/// Rewrites the goal row and its whole milestone list.
pub fn update_goal_in_db(goal: &Goal, db_connection: &mut Connection) -> InternalResult<()> {
    let transaction = db_connection.transaction()?;

    let changed = transaction.execute(
        "UPDATE goals SET title = ?1, description = ?2, category = ?3, priority = ?4, \
         progress = ?5, target_date = ?6, status = ?7, updated_at = ?8, completed_at = ?9 \
         WHERE id = ?10",
        params![
            goal.title,
            goal.description,
            goal.category,
            goal.priority,
            goal.progress,
            goal.target_date,
            goal.status,
            goal.updated_at,
            goal.completed_at,
            goal.id,
        ],
    )?;
    if changed == 0 {
        return Err(goal_not_found());
    }

    delete_milestones_from_db(goal.id, &transaction)?;
    add_milestones_to_db(goal.id, &goal.milestones, &transaction)?;

    transaction.commit()?;

    Ok(())
}

pub fn delete_goal_from_db(goal_id: GoalID, db_connection: &mut Connection) -> InternalResult<()> {
    let transaction = db_connection.transaction()?;

    delete_milestones_from_db(goal_id, &transaction)?;
    let deleted = transaction.execute("DELETE FROM goals WHERE id = ?1", params![goal_id])?;
    if deleted == 0 {
        return Err(goal_not_found());
    }

    transaction.commit()?;

    Ok(())
}
