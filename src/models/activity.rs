// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity model for storage and API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Fixed set of activity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Running,
    Cycling,
    Swimming,
    Walking,
    Weightlifting,
    Yoga,
    Basketball,
    Football,
    Tennis,
    Hiking,
    Dancing,
    Boxing,
    Other,
}

impl ActivityType {
    pub const ALL: [ActivityType; 13] = [
        ActivityType::Running,
        ActivityType::Cycling,
        ActivityType::Swimming,
        ActivityType::Walking,
        ActivityType::Weightlifting,
        ActivityType::Yoga,
        ActivityType::Basketball,
        ActivityType::Football,
        ActivityType::Tennis,
        ActivityType::Hiking,
        ActivityType::Dancing,
        ActivityType::Boxing,
        ActivityType::Other,
    ];

    /// Wire/storage name (e.g. "weightlifting").
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Running => "running",
            ActivityType::Cycling => "cycling",
            ActivityType::Swimming => "swimming",
            ActivityType::Walking => "walking",
            ActivityType::Weightlifting => "weightlifting",
            ActivityType::Yoga => "yoga",
            ActivityType::Basketball => "basketball",
            ActivityType::Football => "football",
            ActivityType::Tennis => "tennis",
            ActivityType::Hiking => "hiking",
            ActivityType::Dancing => "dancing",
            ActivityType::Boxing => "boxing",
            ActivityType::Other => "other",
        }
    }

    /// Parse a wire name. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored activity record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Activity ID (also used as document ID)
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    pub activity_type: ActivityType,
    /// Duration in minutes
    pub duration: u32,
    /// Distance in kilometers (two decimal places)
    pub distance: Option<f64>,
    pub calories_burned: Option<u32>,
    /// Calendar date of the session ("YYYY-MM-DD" in Firestore)
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Distance in integer hundredths of a kilometer, absent = 0.
    ///
    /// Aggregates sum these so that totals do not depend on record order.
    pub fn distance_centi_km(&self) -> i64 {
        self.distance.map(to_hundredths).unwrap_or(0)
    }
}

/// Convert a two-decimal quantity into integer hundredths.
pub fn to_hundredths(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Round to two decimal places for output.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
