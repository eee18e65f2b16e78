use chrono::NaiveDate;
use serde::Serialize;

use std::collections::BTreeMap;

use crate::data::{percentage, Priority};

use super::data::{Task, TaskStatus};

#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub cancelled: usize,
    pub overdue: usize,
    pub by_priority: PriorityCounts,
    pub by_category: BTreeMap<String, usize>,
    pub completion_rate: u32,
    pub overdue_rate: u32,
}

pub fn task_stats(tasks: &[Task], today: NaiveDate) -> TaskStats {
    let mut stats = TaskStats {
        total: tasks.len(),
        ..TaskStats::default()
    };

    for task in tasks {
        match task.status {
            TaskStatus::Completed => stats.completed += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Pending => stats.pending += 1,
            TaskStatus::Cancelled => stats.cancelled += 1,
        }

        if task.is_overdue(today) {
            stats.overdue += 1;
        }

        match task.priority {
            Priority::Low => stats.by_priority.low += 1,
            Priority::Medium => stats.by_priority.medium += 1,
            Priority::High => stats.by_priority.high += 1,
        }

        *stats.by_category.entry(task.category.clone()).or_insert(0) += 1;
    }

    stats.completion_rate = percentage(stats.completed, stats.total);
    stats.overdue_rate = percentage(stats.overdue, stats.total);

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::data::TaskInput;
    use chrono::{TimeZone, Utc};

    fn task(status: TaskStatus, priority: Priority, category: &str, due: Option<(u32, u32)>) -> Task {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        Task::new(
            TaskInput {
                title: String::from("t"),
                category: category.to_string(),
                priority,
                status,
                due_date: due.and_then(|(m, d)| NaiveDate::from_ymd_opt(2024, m, d)),
                ..TaskInput::default()
            },
            now,
        )
    }

    #[test]
    fn empty_collection_has_zero_rates() {
        let stats = task_stats(&[], NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(stats, TaskStats::default());
    }

    #[test]
    fn counts_statuses_priorities_categories_and_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let tasks = vec![
            task(TaskStatus::Completed, Priority::High, "work", Some((3, 1))),
            task(TaskStatus::Pending, Priority::High, "work", Some((3, 9))),
            task(TaskStatus::InProgress, Priority::Low, "home", Some((3, 10))),
            task(TaskStatus::Cancelled, Priority::Medium, "home", None),
        ];

        let stats = task_stats(&tasks, today);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.overdue, 1);
        assert_eq!(
            stats.by_priority,
            PriorityCounts {
                low: 1,
                medium: 1,
                high: 2
            }
        );
        assert_eq!(stats.by_category.get("work"), Some(&2));
        assert_eq!(stats.by_category.get("home"), Some(&2));
        assert_eq!(stats.completion_rate, 25);
        assert_eq!(stats.overdue_rate, 25);
    }
}
