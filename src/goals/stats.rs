use chrono::NaiveDate;
use serde::Serialize;

use std::collections::BTreeMap;

use super::data::{Goal, GoalStatus};

#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct MilestoneCounts {
    pub total: usize,
    pub completed: usize,
}

#[derive(Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalStats {
    pub total: usize,
    pub in_progress: usize,
    pub on_hold: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub overdue: usize,
    pub on_track: usize,
    pub at_risk: usize,
    pub average_progress: f64,
    pub milestones: MilestoneCounts,
    pub by_category: BTreeMap<String, usize>,
}

/// Progress points per day an in-progress goal still needs to hit its
/// target date. `None` for goals without a target or not in progress.
pub fn needed_daily_progress(goal: &Goal, today: NaiveDate) -> Option<f64> {
    if goal.status != GoalStatus::InProgress {
        return None;
    }
    let target = goal.target_date?;
    let days_remaining = (target - today).num_days().max(1);

    Some((100.0 - goal.progress) / days_remaining as f64)
}

pub fn goal_stats(goals: &[Goal], today: NaiveDate) -> GoalStats {
    let mut stats = GoalStats {
        total: goals.len(),
        ..GoalStats::default()
    };
    let mut progress_sum = 0.0;

    for goal in goals {
        match goal.status {
            GoalStatus::InProgress => stats.in_progress += 1,
            GoalStatus::OnHold => stats.on_hold += 1,
            GoalStatus::Completed => stats.completed += 1,
            GoalStatus::Cancelled => stats.cancelled += 1,
        }

        if goal.is_overdue(today) {
            stats.overdue += 1;
        }

        match needed_daily_progress(goal, today) {
            Some(needed) if needed <= 1.0 => stats.on_track += 1,
            Some(_) => stats.at_risk += 1,
            None => {}
        }

        progress_sum += goal.progress;
        stats.milestones.total += goal.milestones.len();
        stats.milestones.completed += goal.milestones.iter().filter(|m| m.completed).count();
        *stats.by_category.entry(goal.category.clone()).or_insert(0) += 1;
    }

    if !goals.is_empty() {
        stats.average_progress = (progress_sum / goals.len() as f64).round();
    }

    stats
}
