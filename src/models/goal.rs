// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Goal model and progress computation.
//!
//! Progress is never stored. It is recomputed from the owner's activities
//! every time a goal is read.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::activity::{Activity, ActivityType};

/// Metric a goal is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Distance,
    Duration,
    Calories,
    Frequency,
}

/// Informational period label. Not used in progress computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl GoalType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "distance" => Some(GoalType::Distance),
            "duration" => Some(GoalType::Duration),
            "calories" => Some(GoalType::Calories),
            "frequency" => Some(GoalType::Frequency),
            _ => None,
        }
    }
}

impl GoalPeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(GoalPeriod::Daily),
            "weekly" => Some(GoalPeriod::Weekly),
            "monthly" => Some(GoalPeriod::Monthly),
            "yearly" => Some(GoalPeriod::Yearly),
            _ => None,
        }
    }
}

/// Stored goal record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Goal ID (also used as document ID)
    pub id: String,
    pub user_id: String,
    pub goal_type: GoalType,
    pub target_value: f64,
    pub period: GoalPeriod,
    /// Restrict progress to one activity type (`None` = all types)
    pub activity_type: Option<ActivityType>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Whether an activity counts toward this goal.
    pub fn matches(&self, activity: &Activity) -> bool {
        activity.date >= self.start_date
            && activity.date <= self.end_date
            && self
                .activity_type
                .map_or(true, |t| t == activity.activity_type)
    }

    /// Compute progress over the given activities.
    ///
    /// Activities outside the goal's window or type are ignored, so passing
    /// the owner's full history gives the same result as a pre-filtered set.
    pub fn progress<'a, I>(&self, activities: I) -> GoalProgress
    where
        I: IntoIterator<Item = &'a Activity>,
    {
        let mut acc = Accumulator::new(self.goal_type);
        for activity in activities.into_iter().filter(|a| self.matches(a)) {
            acc.add(activity);
        }
        let current = acc.finish();

        GoalProgress {
            percentage: percentage(current.as_f64(), self.target_value),
            current,
            target: self.target_value,
        }
    }
}

/// Running total for one goal type.
enum Accumulator {
    /// Hundredths of a kilometer
    Distance(i64),
    Duration(u64),
    Calories(u64),
    Frequency(u64),
}

impl Accumulator {
    fn new(goal_type: GoalType) -> Self {
        match goal_type {
            GoalType::Distance => Accumulator::Distance(0),
            GoalType::Duration => Accumulator::Duration(0),
            GoalType::Calories => Accumulator::Calories(0),
            GoalType::Frequency => Accumulator::Frequency(0),
        }
    }

    fn add(&mut self, activity: &Activity) {
        match self {
            Accumulator::Distance(total) => *total += activity.distance_centi_km(),
            Accumulator::Duration(total) => *total += u64::from(activity.duration),
            Accumulator::Calories(total) => {
                *total += u64::from(activity.calories_burned.unwrap_or(0))
            }
            Accumulator::Frequency(count) => *count += 1,
        }
    }

    fn finish(self) -> ProgressValue {
        match self {
            Accumulator::Distance(centi) => ProgressValue::Decimal(centi as f64 / 100.0),
            Accumulator::Duration(v) | Accumulator::Calories(v) | Accumulator::Frequency(v) => {
                ProgressValue::Integer(v)
            }
        }
    }
}

/// Current value of a goal: a plain JSON integer or a two-decimal number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(untagged)]
pub enum ProgressValue {
    Integer(u64),
    Decimal(f64),
}

impl ProgressValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            ProgressValue::Integer(v) => v as f64,
            ProgressValue::Decimal(v) => v,
        }
    }
}

/// Progress of a goal, embedded in every goal response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GoalProgress {
    pub current: ProgressValue,
    pub target: f64,
    pub percentage: f64,
}

/// `min(100, current / target * 100)`, or 0 when the target is not positive.
pub fn percentage(current: f64, target: f64) -> f64 {
    if target > 0.0 {
        (current / target * 100.0).min(100.0).max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_activity(
        activity_type: ActivityType,
        day: &str,
        duration: u32,
        distance: Option<f64>,
        calories: Option<u32>,
    ) -> Activity {
        let now = Utc::now();
        Activity {
            id: format!("act-{}-{}", day, duration),
            user_id: "user-1".to_string(),
            activity_type,
            duration,
            distance,
            calories_burned: calories,
            date: date(day),
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn make_goal(goal_type: GoalType, target: f64, activity_type: Option<ActivityType>) -> Goal {
        let now = Utc::now();
        Goal {
            id: "goal-1".to_string(),
            user_id: "user-1".to_string(),
            goal_type,
            target_value: target,
            period: GoalPeriod::Monthly,
            activity_type,
            start_date: date("2024-01-01"),
            end_date: date("2024-01-31"),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> Vec<Activity> {
        vec![
            make_activity(ActivityType::Running, "2024-01-10", 30, Some(5.0), Some(200)),
            make_activity(ActivityType::Running, "2024-01-20", 45, None, None),
        ]
    }

    #[test]
    fn test_distance_goal_half_way() {
        let goal = make_goal(GoalType::Distance, 10.0, None);
        let progress = goal.progress(&sample());

        assert_eq!(progress.current, ProgressValue::Decimal(5.0));
        assert_eq!(progress.target, 10.0);
        assert_eq!(progress.percentage, 50.0);
    }

    #[test]
    fn test_frequency_goal_counts_records() {
        let goal = make_goal(GoalType::Frequency, 5.0, None);
        let progress = goal.progress(&sample());

        assert_eq!(progress.current, ProgressValue::Integer(2));
        assert_eq!(progress.percentage, 40.0);
    }

    #[test]
    fn test_duration_and_calories_treat_missing_as_zero() {
        let activities = sample();

        let duration = make_goal(GoalType::Duration, 150.0, None).progress(&activities);
        assert_eq!(duration.current, ProgressValue::Integer(75));
        assert_eq!(duration.percentage, 50.0);

        let calories = make_goal(GoalType::Calories, 1000.0, None).progress(&activities);
        assert_eq!(calories.current, ProgressValue::Integer(200));
        assert_eq!(calories.percentage, 20.0);
    }

    #[test]
    fn test_percentage_clamped_at_100() {
        let goal = make_goal(GoalType::Duration, 10.0, None);
        let progress = goal.progress(&sample());

        assert_eq!(progress.current, ProgressValue::Integer(75));
        assert_eq!(progress.percentage, 100.0);
    }

    #[test]
    fn test_percentage_is_not_rounded() {
        let activities = vec![make_activity(ActivityType::Yoga, "2024-01-10", 30, None, None)];
        let progress = make_goal(GoalType::Frequency, 3.0, None).progress(&activities);

        assert_eq!(progress.current, ProgressValue::Integer(1));
        assert_eq!(progress.percentage, 1.0 / 3.0 * 100.0);
        assert!(progress.percentage > 33.33);
    }

    #[test]
    fn test_zero_or_negative_target_is_zero_percent() {
        let activities = sample();
        assert_eq!(
            make_goal(GoalType::Frequency, 0.0, None)
                .progress(&activities)
                .percentage,
            0.0
        );
        assert_eq!(
            make_goal(GoalType::Frequency, -5.0, None)
                .progress(&activities)
                .percentage,
            0.0
        );
    }

    #[test]
    fn test_window_is_inclusive_and_excludes_outside() {
        let activities = vec![
            make_activity(ActivityType::Cycling, "2023-12-31", 10, None, None),
            make_activity(ActivityType::Cycling, "2024-01-01", 20, None, None),
            make_activity(ActivityType::Cycling, "2024-01-31", 30, None, None),
            make_activity(ActivityType::Cycling, "2024-02-01", 40, None, None),
        ];
        let goal = make_goal(GoalType::Duration, 100.0, None);

        assert_eq!(goal.progress(&activities).current, ProgressValue::Integer(50));
    }

    #[test]
    fn test_activity_type_filter() {
        let mut activities = sample();
        activities.push(make_activity(
            ActivityType::Swimming,
            "2024-01-15",
            60,
            Some(2.0),
            None,
        ));

        let swim = make_goal(GoalType::Distance, 4.0, Some(ActivityType::Swimming));
        let progress = swim.progress(&activities);
        assert_eq!(progress.current, ProgressValue::Decimal(2.0));
        assert_eq!(progress.percentage, 50.0);

        let all = make_goal(GoalType::Distance, 14.0, None);
        assert_eq!(all.progress(&activities).current, ProgressValue::Decimal(7.0));
    }

    #[test]
    fn test_progress_serializes_plain_numbers() {
        let progress = make_goal(GoalType::Frequency, 5.0, None).progress(&sample());
        let json = serde_json::to_value(progress).unwrap();
        assert_eq!(json["current"], serde_json::json!(2));
        assert_eq!(json["target"], serde_json::json!(5.0));
        assert_eq!(json["percentage"], serde_json::json!(40.0));

        let progress = make_goal(GoalType::Distance, 10.0, None).progress(&sample());
        let json = serde_json::to_value(progress).unwrap();
        assert_eq!(json["current"], serde_json::json!(5.0));
    }

    #[test]
    fn test_distance_sum_is_order_independent() {
        let mut activities: Vec<Activity> = [0.1, 0.2, 0.3, 1.07, 2.93]
            .iter()
            .map(|d| make_activity(ActivityType::Walking, "2024-01-05", 10, Some(*d), None))
            .collect();
        let goal = make_goal(GoalType::Distance, 100.0, None);

        let forward = goal.progress(&activities);
        activities.reverse();
        let backward = goal.progress(&activities);

        assert_eq!(forward, backward);
        assert_eq!(forward.current, ProgressValue::Decimal(4.6));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(GoalType::parse("frequency"), Some(GoalType::Frequency));
        assert_eq!(GoalType::parse("Frequency"), None);
        assert_eq!(GoalPeriod::parse("weekly"), Some(GoalPeriod::Weekly));
        assert_eq!(GoalPeriod::parse("hourly"), None);
    }
}
