// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod developer;
pub mod goal;
pub mod metrics;
pub mod user;

pub use activity::{Activity, ActivityType};
pub use developer::Developer;
pub use goal::{Goal, GoalPeriod, GoalProgress, GoalType, ProgressValue};
pub use metrics::ActivityMetrics;
pub use user::{UniqueClaim, User};
