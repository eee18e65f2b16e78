use chrono::{Duration, NaiveDate};
use serde::Serialize;

use std::collections::HashSet;

use super::data::{HealthEntry, HealthType};

/// Streaks are only looked for within the last week.
pub const MAX_STREAK: u32 = 7;

#[derive(Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthStats {
    pub total_entries: usize,
    pub workouts: usize,
    pub total_duration: i64,
    pub total_calories: i64,
    pub average_workout_duration: f64,
    pub current_weight: Option<f64>,
    pub total_water: f64,
    pub weekly_duration: i64,
    pub weekly_calories: i64,
    pub workout_streak: u32,
    /// The last seven days, oldest first.
    pub weekly: Vec<DayPoint>,
    pub weight_trend: Vec<WeightPoint>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayPoint {
    pub date: NaiveDate,
    /// Short weekday name, e.g. "Mon".
    pub day: String,
    pub workouts: usize,
    pub calories: i64,
    pub water: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight: f64,
}

/// Consecutive days ending today that have at least one workout.
pub fn workout_streak(entries: &[HealthEntry], today: NaiveDate) -> u32 {
    let workout_days: HashSet<NaiveDate> = entries
        .iter()
        .filter(|entry| entry.kind == HealthType::Workout)
        .map(|entry| entry.date)
        .collect();

    let mut streak = 0;
    let mut day = today;
    while streak < MAX_STREAK && workout_days.contains(&day) {
        streak += 1;
        day = day - Duration::days(1);
    }

    streak
}

/// Latest weight entry by date, ties broken by id.
pub fn current_weight(entries: &[HealthEntry]) -> Option<f64> {
    entries
        .iter()
        .filter(|entry| entry.kind == HealthType::Weight)
        .filter_map(|entry| entry.weight.map(|weight| (entry.date, entry.id, weight)))
        .max_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)))
        .map(|(_, _, weight)| weight)
}

pub fn weekly_breakdown(entries: &[HealthEntry], today: NaiveDate) -> Vec<DayPoint> {
    (0..7)
        .rev()
        .map(|days_ago| {
            let date = today - Duration::days(days_ago);
            let mut point = DayPoint {
                date,
                day: date.format("%a").to_string(),
                workouts: 0,
                calories: 0,
                water: 0.0,
            };

            for entry in entries.iter().filter(|entry| entry.date == date) {
                point.calories = point.calories.saturating_add(entry.calories.unwrap_or(0));
                match entry.kind {
                    HealthType::Workout => point.workouts += 1,
                    HealthType::Water => point.water += entry.water.unwrap_or(0.0),
                    HealthType::Diet | HealthType::Weight => {}
                }
            }

            point
        })
        .collect()
}

/// Recorded weights by date, ties broken by id.
pub fn weight_trend(entries: &[HealthEntry]) -> Vec<WeightPoint> {
    let mut weights: Vec<_> = entries
        .iter()
        .filter(|entry| entry.kind == HealthType::Weight)
        .filter_map(|entry| entry.weight.map(|weight| (entry.date, entry.id, weight)))
        .collect();
    weights.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    weights
        .into_iter()
        .map(|(date, _, weight)| WeightPoint { date, weight })
        .collect()
}

pub fn health_stats(entries: &[HealthEntry], today: NaiveDate) -> HealthStats {
    let week_start = today - Duration::days(6);
    let mut stats = HealthStats {
        total_entries: entries.len(),
        current_weight: current_weight(entries),
        workout_streak: workout_streak(entries, today),
        weekly: weekly_breakdown(entries, today),
        weight_trend: weight_trend(entries),
        ..HealthStats::default()
    };
    let mut workout_duration: i64 = 0;

    for entry in entries {
        let duration = entry.duration.unwrap_or(0);
        let calories = entry.calories.unwrap_or(0);
        stats.total_duration = stats.total_duration.saturating_add(duration);
        stats.total_calories = stats.total_calories.saturating_add(calories);

        match entry.kind {
            HealthType::Workout => {
                stats.workouts += 1;
                workout_duration = workout_duration.saturating_add(duration);
                if entry.date >= week_start && entry.date <= today {
                    stats.weekly_duration = stats.weekly_duration.saturating_add(duration);
                    stats.weekly_calories = stats.weekly_calories.saturating_add(calories);
                }
            }
            HealthType::Water => stats.total_water += entry.water.unwrap_or(0.0),
            HealthType::Diet | HealthType::Weight => {}
        }
    }

    if stats.workouts > 0 {
        stats.average_workout_duration = (workout_duration as f64 / stats.workouts as f64).round();
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: i64, kind: HealthType, date: NaiveDate) -> HealthEntry {
        HealthEntry {
            id,
            kind,
            title: String::from("entry"),
            description: String::new(),
            date,
            duration: None,
            calories: None,
            weight: None,
            water: None,
            created_at: Utc::now(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn streak_counts_back_from_today_until_a_gap() {
        let entries = vec![
            entry(1, HealthType::Workout, day(10)),
            entry(2, HealthType::Workout, day(9)),
            entry(3, HealthType::Workout, day(9)),
            entry(4, HealthType::Workout, day(7)),
            entry(5, HealthType::Diet, day(8)),
        ];
        assert_eq!(workout_streak(&entries, day(10)), 2);
        assert_eq!(workout_streak(&entries, day(11)), 0);
    }

    #[test]
    fn streak_is_capped_at_a_week() {
        let entries: Vec<_> = (1..=20)
            .map(|d| entry(d as i64, HealthType::Workout, day(d)))
            .collect();
        assert_eq!(workout_streak(&entries, day(20)), MAX_STREAK);
    }

    #[test]
    fn current_weight_prefers_latest_date_then_id() {
        let mut older = entry(9, HealthType::Weight, day(1));
        older.weight = Some(80.0);
        let mut first = entry(2, HealthType::Weight, day(5));
        first.weight = Some(79.0);
        let mut second = entry(3, HealthType::Weight, day(5));
        second.weight = Some(78.5);

        assert_eq!(current_weight(&[older, second, first]), Some(78.5));
        assert_eq!(current_weight(&[]), None);
    }

    #[test]
    fn totals_and_weekly_window() {
        let mut run = entry(1, HealthType::Workout, day(10));
        run.duration = Some(30);
        run.calories = Some(300);
        let mut old_ride = entry(2, HealthType::Workout, day(1));
        old_ride.duration = Some(60);
        old_ride.calories = Some(500);
        let mut lunch = entry(3, HealthType::Diet, day(10));
        lunch.calories = Some(650);
        let mut bottle = entry(4, HealthType::Water, day(10));
        bottle.water = Some(1.5);

        let stats = health_stats(&[run, old_ride, lunch, bottle], day(10));

        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.workouts, 2);
        assert_eq!(stats.total_duration, 90);
        assert_eq!(stats.total_calories, 1450);
        assert_eq!(stats.average_workout_duration, 45.0);
        assert_eq!(stats.weekly_duration, 30);
        assert_eq!(stats.weekly_calories, 300);
        assert_eq!(stats.total_water, 1.5);
        assert_eq!(stats.workout_streak, 1);
        assert_eq!(stats.current_weight, None);
    }

    #[test]
    fn oversized_rows_saturate_instead_of_overflowing() {
        let mut first = entry(1, HealthType::Workout, day(10));
        first.duration = Some(i64::MAX);
        first.calories = Some(i64::MAX);
        let mut second = first.clone();
        second.id = 2;

        let stats = health_stats(&[first, second], day(10));

        assert_eq!(stats.total_duration, i64::MAX);
        assert_eq!(stats.total_calories, i64::MAX);
        assert_eq!(stats.weekly_duration, i64::MAX);
        assert_eq!(stats.weekly[6].calories, i64::MAX);
    }

    #[test]
    fn weekly_breakdown_covers_seven_days_oldest_first() {
        let mut run = entry(1, HealthType::Workout, day(10));
        run.calories = Some(300);
        let swim = entry(2, HealthType::Workout, day(10));
        let mut lunch = entry(3, HealthType::Diet, day(8));
        lunch.calories = Some(650);
        let mut bottle = entry(4, HealthType::Water, day(8));
        bottle.water = Some(0.5);
        let mut stale = entry(5, HealthType::Workout, day(3));
        stale.calories = Some(999);

        let weekly = weekly_breakdown(&[run, swim, lunch, bottle, stale], day(10));

        assert_eq!(weekly.len(), 7);
        assert_eq!(weekly[0].date, day(4));
        assert_eq!(weekly[6].date, day(10));
        // 2024-06-10 was a Monday.
        assert_eq!(weekly[6].day, "Mon");
        assert_eq!(weekly[6].workouts, 2);
        assert_eq!(weekly[6].calories, 300);
        assert_eq!(weekly[4].calories, 650);
        assert_eq!(weekly[4].water, 0.5);
        assert_eq!(weekly[4].workouts, 0);
        assert!(weekly.iter().all(|point| point.calories != 999));
    }

    #[test]
    fn weight_trend_is_chronological() {
        let mut late = entry(4, HealthType::Weight, day(9));
        late.weight = Some(78.0);
        let mut early = entry(7, HealthType::Weight, day(2));
        early.weight = Some(80.5);
        let unweighed = entry(8, HealthType::Weight, day(5));
        let workout = entry(9, HealthType::Workout, day(3));

        let trend = weight_trend(&[late, unweighed, workout, early]);

        assert_eq!(
            trend,
            vec![
                WeightPoint { date: day(2), weight: 80.5 },
                WeightPoint { date: day(9), weight: 78.0 },
            ]
        );
    }
}
