//! Activity metrics aggregated over a filtered set of activities.
//!
//! Computed on demand for the metrics endpoint; nothing here is persisted.

use serde::Serialize;
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::activity::{round2, Activity};

/// Sentinel reported when there are no activities to rank.
pub const NO_ACTIVITY: &str = "None";

/// Aggregate metrics response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityMetrics {
    pub total_activities: u64,
    /// Minutes
    pub total_duration: u64,
    /// Kilometers, two decimals
    pub total_distance: f64,
    pub total_calories: u64,
    /// Minutes, two decimals
    pub average_duration: f64,
    pub most_common_activity: String,
    /// Count per activity type present in the set
    pub activities_by_type: BTreeMap<String, u64>,
}

impl ActivityMetrics {
    /// Aggregate a set of activities.
    pub fn from_activities<'a, I>(activities: I) -> Self
    where
        I: IntoIterator<Item = &'a Activity>,
    {
        let mut acc = MetricsAccumulator::default();
        for activity in activities {
            acc.update_from_activity(activity);
        }
        acc.finish()
    }
}

/// Running totals. Every field is an exact integer so the result does not
/// depend on the order activities arrive in.
#[derive(Debug, Default)]
pub struct MetricsAccumulator {
    total_activities: u64,
    total_duration: u64,
    /// Hundredths of a kilometer
    total_distance_centi: i64,
    total_calories: u64,
    by_type: BTreeMap<String, u64>,
}

impl MetricsAccumulator {
    /// Fold one activity into the totals.
    pub fn update_from_activity(&mut self, activity: &Activity) {
        self.total_activities += 1;
        self.total_duration += u64::from(activity.duration);
        self.total_distance_centi += activity.distance_centi_km();
        self.total_calories += u64::from(activity.calories_burned.unwrap_or(0));

        *self
            .by_type
            .entry(activity.activity_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn finish(self) -> ActivityMetrics {
        let average_duration = if self.total_activities > 0 {
            round2(self.total_duration as f64 / self.total_activities as f64)
        } else {
            0.0
        };

        ActivityMetrics {
            total_activities: self.total_activities,
            total_duration: self.total_duration,
            total_distance: self.total_distance_centi as f64 / 100.0,
            total_calories: self.total_calories,
            average_duration,
            most_common_activity: most_common(&self.by_type),
            activities_by_type: self.by_type,
        }
    }
}

/// Type with the highest count; ties go to the lexicographically smallest name.
fn most_common(by_type: &BTreeMap<String, u64>) -> String {
    let mut best: Option<(&String, u64)> = None;
    // BTreeMap iterates in name order, so only a strictly greater count wins.
    for (name, &count) in by_type {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.clone())
        .unwrap_or_else(|| NO_ACTIVITY.to_string())
}
