use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::{text_enum, Priority};
use crate::internal_error::{InternalError, InternalResult};
use crate::validation::{trim, Validate, Violations};

pub type GoalID = i64;

pub const DEFAULT_CATEGORY: &str = "personal";

text_enum!(GoalStatus {
    InProgress => "in-progress",
    OnHold => "on-hold",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl Default for GoalStatus {
    fn default() -> Self {
        GoalStatus::InProgress
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub text: String,
    pub completed: bool,
}

/// Milestones may be sent as bare strings or as full objects.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum MilestoneInput {
    Text(String),
    Full {
        text: String,
        #[serde(default)]
        completed: bool,
    },
}

impl From<MilestoneInput> for Milestone {
    fn from(input: MilestoneInput) -> Milestone {
        match input {
            MilestoneInput::Text(text) => Milestone {
                text,
                completed: false,
            },
            MilestoneInput::Full { text, completed } => Milestone { text, completed },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: GoalID,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub progress: f64,
    pub milestones: Vec<Milestone>,
    pub target_date: Option<NaiveDate>,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GoalInput {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub progress: f64,
    pub milestones: Vec<MilestoneInput>,
    pub target_date: Option<NaiveDate>,
    pub status: GoalStatus,
}

const MAX_MILESTONE_LENGTH: usize = 200;

impl Validate for GoalInput {
    fn validate(&mut self) -> InternalResult<()> {
        trim(&mut self.title);
        trim(&mut self.description);
        trim(&mut self.category);
        if self.category.is_empty() {
            self.category = String::from(DEFAULT_CATEGORY);
        }
        for milestone in self.milestones.iter_mut() {
            match milestone {
                MilestoneInput::Text(text) | MilestoneInput::Full { text, .. } => trim(text),
            }
        }
        // Blank lines in a milestone list carry nothing.
        self.milestones.retain(|milestone| match milestone {
            MilestoneInput::Text(text) | MilestoneInput::Full { text, .. } => !text.is_empty(),
        });

        let mut violations = Violations::new();
        violations.length("title", &self.title, 1, 200);
        violations.length("description", &self.description, 0, 1000);
        violations.length("category", &self.category, 1, 100);
        if !self.progress.is_finite() {
            violations.push("progress", "progress must be a number", None);
        }
        for milestone in &self.milestones {
            let text = match milestone {
                MilestoneInput::Text(text) | MilestoneInput::Full { text, .. } => text,
            };
            if text.chars().count() > MAX_MILESTONE_LENGTH {
                violations.push(
                    "milestones",
                    format!("milestones must not exceed {} characters each", MAX_MILESTONE_LENGTH),
                    Some(Value::from(text.as_str())),
                );
            }
        }
        violations.finish()
    }
}

/// Body of `POST /api/goals/<id>/milestones`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct NewMilestone {
    pub text: String,
}

impl Validate for NewMilestone {
    fn validate(&mut self) -> InternalResult<()> {
        trim(&mut self.text);

        let mut violations = Violations::new();
        violations.length("text", &self.text, 1, MAX_MILESTONE_LENGTH);
        violations.finish()
    }
}

pub fn goal_not_found() -> InternalError {
    InternalError::NotFound {
        entity: "Goal",
        code: "GOAL_NOT_FOUND",
    }
}

fn invalid_milestone(index: usize) -> InternalError {
    InternalError::rule(
        "INVALID_MILESTONE_INDEX",
        format!("Milestone {} does not exist", index),
    )
}

impl Goal {
    /// A goal that has not been stored yet (`id` is 0).
    pub fn new(input: GoalInput, now: DateTime<Utc>) -> Goal {
        let mut goal = Goal {
            id: 0,
            title: String::new(),
            description: String::new(),
            category: String::new(),
            priority: Priority::default(),
            progress: 0.0,
            milestones: vec![],
            target_date: None,
            status: GoalStatus::default(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        goal.replace(input, now);
        goal
    }

    pub fn replace(&mut self, input: GoalInput, now: DateTime<Utc>) {
        self.title = input.title;
        self.description = input.description;
        self.category = input.category;
        self.priority = input.priority;
        self.milestones = input.milestones.into_iter().map(Milestone::from).collect();
        self.target_date = input.target_date;
        self.status = input.status;
        self.progress = input.progress.clamp(0.0, 100.0);

        if self.status == GoalStatus::Completed {
            self.progress = 100.0;
        } else if self.progress >= 100.0 {
            self.status = GoalStatus::Completed;
        }
        self.settle(now);
    }

    /// Clamps into 0..=100; full progress completes the goal and anything
    /// less reopens a completed one.
    pub fn set_progress(&mut self, progress: f64, now: DateTime<Utc>) {
        self.progress = progress.clamp(0.0, 100.0);
        if self.progress >= 100.0 {
            self.status = GoalStatus::Completed;
        } else if self.status == GoalStatus::Completed {
            self.status = GoalStatus::InProgress;
        }
        self.settle(now);
    }

    pub fn set_status(&mut self, status: GoalStatus, now: DateTime<Utc>) {
        self.status = status;
        if status == GoalStatus::Completed {
            self.progress = 100.0;
        } else if self.progress >= 100.0 {
            // Reopened: fall back to what the milestones say, unless they
            // are all done too.
            self.progress = match self.milestone_progress() {
                Some(progress) if progress < 100.0 => progress,
                _ => 0.0,
            };
        }
        self.settle(now);
    }

    pub fn add_milestone(&mut self, text: String, now: DateTime<Utc>) {
        self.milestones.push(Milestone {
            text,
            completed: false,
        });
        self.sync_milestone_progress(now);
    }

    pub fn toggle_milestone(&mut self, index: usize, now: DateTime<Utc>) -> InternalResult<()> {
        let milestone = self
            .milestones
            .get_mut(index)
            .ok_or_else(|| invalid_milestone(index))?;
        milestone.completed = !milestone.completed;
        self.sync_milestone_progress(now);

        Ok(())
    }

    pub fn remove_milestone(&mut self, index: usize, now: DateTime<Utc>) -> InternalResult<Milestone> {
        if index >= self.milestones.len() {
            return Err(invalid_milestone(index));
        }
        let removed = self.milestones.remove(index);
        self.sync_milestone_progress(now);

        Ok(removed)
    }

    /// Share of completed milestones, `None` without milestones.
    pub fn milestone_progress(&self) -> Option<f64> {
        if self.milestones.is_empty() {
            return None;
        }
        let completed = self.milestones.iter().filter(|m| m.completed).count();

        Some(completed as f64 / self.milestones.len() as f64 * 100.0)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != GoalStatus::Completed && self.target_date.map_or(false, |target| target < today)
    }

    fn sync_milestone_progress(&mut self, now: DateTime<Utc>) {
        match self.milestone_progress() {
            Some(progress) => self.set_progress(progress, now),
            None => self.settle(now),
        }
    }

    fn settle(&mut self, now: DateTime<Utc>) {
        if self.status == GoalStatus::Completed {
            self.completed_at.get_or_insert(now);
        } else {
            self.completed_at = None;
        }
        self.updated_at = now;
    }
}
