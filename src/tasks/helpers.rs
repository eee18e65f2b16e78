use chrono::{Duration, NaiveDate};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};

use std::collections::HashMap;

use crate::internal_error::InternalResult;
use crate::listing::{query_page, Filter, Page, SortKey};

use super::data::*;

const TASK_COLUMNS: &str = "id, title, description, priority, category, due_date, status, \
                            completed, progress, created_at, updated_at, completed_at";

pub const TASK_SORT_KEYS: &[SortKey] = &[
    SortKey {
        name: "dueDate",
        column: "due_date",
    },
    SortKey {
        name: "createdAt",
        column: "created_at",
    },
    SortKey {
        name: "updatedAt",
        column: "updated_at",
    },
    SortKey {
        name: "title",
        column: "title",
    },
    SortKey {
        name: "priority",
        column: "CASE priority WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END",
    },
    SortKey {
        name: "status",
        column: "status",
    },
    SortKey {
        name: "progress",
        column: "progress",
    },
];

/// Tags are filled in separately from `task_tags`.
pub fn get_task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        priority: row.get(3)?,
        category: row.get(4)?,
        due_date: row.get(5)?,
        status: row.get(6)?,
        completed: row.get(7)?,
        progress: row.get(8)?,
        tags: vec![],
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        completed_at: row.get(11)?,
    })
}

pub fn get_tags_from_db(task_id: TaskID, db_connection: &Connection) -> InternalResult<Vec<String>> {
    let mut statement =
        db_connection.prepare("SELECT tag FROM task_tags WHERE task_id = ?1 ORDER BY num")?;
    let tags = statement
        .query_map(params![task_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    Ok(tags)
}

fn get_tag_map_from_db(db_connection: &Connection) -> InternalResult<HashMap<TaskID, Vec<String>>> {
    let mut tag_map: HashMap<TaskID, Vec<String>> = HashMap::new();

    let mut statement =
        db_connection.prepare("SELECT task_id, tag FROM task_tags ORDER BY task_id, num")?;
    let mut rows = statement.query(params![])?;
    while let Some(row) = rows.next()? {
        let task_id: TaskID = row.get(0)?;
        tag_map.entry(task_id).or_default().push(row.get(1)?);
    }

    Ok(tag_map)
}

fn fill_tags(tasks: &mut [Task], db_connection: &Connection) -> InternalResult<()> {
    for task in tasks.iter_mut() {
        task.tags = get_tags_from_db(task.id, db_connection)?;
    }

    Ok(())
}

pub fn get_task_from_db(task_id: TaskID, db_connection: &Connection) -> InternalResult<Task> {
    let mut task = db_connection
        .query_row(
            &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
            params![task_id],
            get_task_from_row,
        )
        .optional()?
        .ok_or_else(task_not_found)?;
    task.tags = get_tags_from_db(task_id, db_connection)?;

    Ok(task)
}

pub fn get_all_tasks_from_db(db_connection: &Connection) -> InternalResult<Vec<Task>> {
    let mut tag_map = get_tag_map_from_db(db_connection)?;

    let mut statement =
        db_connection.prepare(&format!("SELECT {} FROM tasks ORDER BY id", TASK_COLUMNS))?;
    let mut tasks = statement
        .query_map(params![], get_task_from_row)?
        .collect::<rusqlite::Result<Vec<Task>>>()?;

    for task in tasks.iter_mut() {
        task.tags = tag_map.remove(&task.id).unwrap_or_default();
    }

    Ok(tasks)
}

/// Most recently created tasks first.
pub fn get_recent_tasks_from_db(limit: i64, db_connection: &Connection) -> InternalResult<Vec<Task>> {
    let mut statement = db_connection.prepare(&format!(
        "SELECT {} FROM tasks ORDER BY created_at DESC, id DESC LIMIT ?1",
        TASK_COLUMNS
    ))?;
    let mut tasks = statement
        .query_map(params![limit], get_task_from_row)?
        .collect::<rusqlite::Result<Vec<Task>>>()?;
    fill_tags(&mut tasks, db_connection)?;

    Ok(tasks)
}

pub fn list_tasks_from_db(
    filter: &Filter,
    page: &Page,
    db_connection: &Connection,
) -> InternalResult<(Vec<Task>, i64)> {
    let (mut tasks, total) =
        query_page(db_connection, "tasks", TASK_COLUMNS, filter, page, get_task_from_row)?;
    fill_tags(&mut tasks, db_connection)?;

    Ok((tasks, total))
}

/// Case-insensitive match on title, description or any tag.
pub fn search_filter(filter: &mut Filter, term: &str) {
    filter.matches_any(
        &[
            "title LIKE ? ESCAPE '\\'",
            "description LIKE ? ESCAPE '\\'",
            "id IN (SELECT task_id FROM task_tags WHERE tag LIKE ? ESCAPE '\\')",
        ],
        term,
    );
}

pub fn due_window_filter(filter: &mut Filter, window: DueWindow, today: NaiveDate) {
    let today_text = today.to_string();
    match window {
        DueWindow::Today => {
            filter.eq("due_date", today_text);
        }
        DueWindow::Overdue => {
            filter.clause(
                "due_date < ? AND completed = 0",
                vec![Value::Text(today_text)],
            );
        }
        DueWindow::Week => {
            let week_end = (today + Duration::days(7)).to_string();
            filter.clause(
                "due_date BETWEEN ? AND ?",
                vec![Value::Text(today_text), Value::Text(week_end)],
            );
        }
    }
}

fn add_tags_to_db(task_id: TaskID, tags: &[String], db_connection: &Connection) -> InternalResult<()> {
    let mut statement =
        db_connection.prepare("INSERT INTO task_tags (task_id, num, tag) VALUES (?1, ?2, ?3)")?;
    for (num, tag) in tags.iter().enumerate() {
        statement.execute(params![task_id, num as i64, tag])?;
    }

    Ok(())
}

fn delete_tags_from_db(task_id: TaskID, db_connection: &Connection) -> InternalResult<()> {
    db_connection.execute("DELETE FROM task_tags WHERE task_id = ?1", params![task_id])?;

    Ok(())
}

pub fn add_task_to_db(task: &Task, db_connection: &mut Connection) -> InternalResult<TaskID> {
    let transaction = db_connection.transaction()?;

    transaction.execute(
        "INSERT INTO tasks (title, description, priority, category, due_date, status, completed, \
         progress, created_at, updated_at, completed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            task.title,
            task.description,
            task.priority,
            task.category,
            task.due_date,
            task.status,
            task.completed,
            task.progress,
            task.created_at,
            task.updated_at,
            task.completed_at,
        ],
    )?;
    let task_id = transaction.last_insert_rowid();
    add_tags_to_db(task_id, &task.tags, &transaction)?;

    transaction.commit()?;

    Ok(task_id)
}

/// Rewrites the task row and its whole tag list.
pub fn update_task_in_db(task: &Task, db_connection: &mut Connection) -> InternalResult<()> {
    let transaction = db_connection.transaction()?;

    let changed = transaction.execute(
        "UPDATE tasks SET title = ?1, description = ?2, priority = ?3, category = ?4, \
         due_date = ?5, status = ?6, completed = ?7, progress = ?8, updated_at = ?9, \
         completed_at = ?10 WHERE id = ?11",
        params![
            task.title,
            task.description,
            task.priority,
            task.category,
            task.due_date,
            task.status,
            task.completed,
            task.progress,
            task.updated_at,
            task.completed_at,
            task.id,
        ],
    )?;
    if changed == 0 {
        return Err(task_not_found());
    }

    delete_tags_from_db(task.id, &transaction)?;
    add_tags_to_db(task.id, &task.tags, &transaction)?;

    transaction.commit()?;

    Ok(())
}

pub fn delete_task_from_db(task_id: TaskID, db_connection: &mut Connection) -> InternalResult<()> {
    let transaction = db_connection.transaction()?;

    delete_tags_from_db(task_id, &transaction)?;
    let deleted = transaction.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
    if deleted == 0 {
        return Err(task_not_found());
    }

    transaction.commit()?;

    Ok(())
}
