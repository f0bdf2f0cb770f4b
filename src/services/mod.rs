// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod api_key;
pub mod password;

pub use activity::{paginate, ActivityFilter, ActivityOrdering, ActivityQuery, Page, PageRequest};
pub use password::PasswordHasher;
