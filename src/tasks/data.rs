use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{text_enum, Priority};
use crate::internal_error::{InternalError, InternalResult};
use crate::validation::{trim, Validate, Violations};

pub type TaskID = i64;

pub const DEFAULT_CATEGORY: &str = "personal";
pub const MAX_TAG_LENGTH: usize = 50;

text_enum!(TaskStatus {
    Pending => "pending",
    InProgress => "in-progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

text_enum!(
    /// `due` filter of the task listing.
    DueWindow {
        Today => "today",
        Overdue => "overdue",
        Week => "week",
    }
);

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskID,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: String,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub completed: bool,
    pub progress: i64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskInput {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: String,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub progress: i64,
    pub tags: Vec<String>,
}

impl Validate for TaskInput {
    fn validate(&mut self) -> InternalResult<()> {
        trim(&mut self.title);
        trim(&mut self.description);
        trim(&mut self.category);
        if self.category.is_empty() {
            self.category = String::from(DEFAULT_CATEGORY);
        }

        let mut violations = Violations::new();
        violations.length("title", &self.title, 1, 200);
        violations.length("description", &self.description, 0, 1000);
        violations.length("category", &self.category, 1, 100);
        violations.range("progress", self.progress as f64, 0.0, 100.0);

        self.tags.iter_mut().for_each(trim);
        self.tags.retain(|tag| !tag.is_empty());
        for tag in &self.tags {
            violations.length("tags", tag, 1, MAX_TAG_LENGTH);
        }

        violations.finish()
    }
}

pub fn task_not_found() -> InternalError {
    InternalError::NotFound {
        entity: "Task",
        code: "TASK_NOT_FOUND",
    }
}

impl Task {
    /// A task that has not been stored yet (`id` is 0).
    pub fn new(input: TaskInput, now: DateTime<Utc>) -> Task {
        let mut task = Task {
            id: 0,
            title: String::new(),
            description: String::new(),
            priority: Priority::default(),
            category: String::new(),
            due_date: None,
            status: TaskStatus::default(),
            completed: false,
            progress: 0,
            tags: vec![],
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        task.replace(input, now);
        task
    }

    /// Full replace; identity and creation time survive.
    pub fn replace(&mut self, input: TaskInput, now: DateTime<Utc>) {
        self.title = input.title;
        self.description = input.description;
        self.priority = input.priority;
        self.category = input.category;
        self.due_date = input.due_date;
        self.status = input.status;
        self.progress = input.progress;
        self.tags = input.tags;
        self.settle(now);
    }

    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.status = if self.completed {
            TaskStatus::InProgress
        } else {
            TaskStatus::Completed
        };
        self.settle(now);
    }

    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        self.status = status;
        self.settle(now);
    }

    /// Full progress completes the task; any progress starts a pending one.
    pub fn set_progress(&mut self, progress: i64, now: DateTime<Utc>) {
        self.progress = progress;
        if progress == 100 {
            self.status = TaskStatus::Completed;
        } else if progress > 0 && self.status == TaskStatus::Pending {
            self.status = TaskStatus::InProgress;
        }
        self.settle(now);
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.map_or(false, |due| due < today)
    }

    // completed <=> status completed, completed_at set exactly when completed
    fn settle(&mut self, now: DateTime<Utc>) {
        self.completed = self.status == TaskStatus::Completed;
        if self.completed {
            self.completed_at.get_or_insert(now);
        } else {
            self.completed_at = None;
        }
        self.updated_at = now;
    }
}
