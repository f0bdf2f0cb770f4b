// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Fitness Tracker: log workouts, track goals, and query activity metrics.
//!
//! This crate provides the backend API: activity and goal CRUD with
//! computed goal progress, aggregate metrics, JWT user accounts, and API
//! keys for developers.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::PasswordHasher;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub passwords: PasswordHasher,
}
