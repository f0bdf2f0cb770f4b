// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Developer (API consumer) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REQUESTS_PER_HOUR: u32 = 1000;
pub const DEFAULT_REQUESTS_PER_DAY: u32 = 10000;

/// Developer record stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Developer {
    /// Developer ID (also used as document ID)
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub description: String,
    /// Current API key. Replaced on regeneration.
    pub api_key: String,
    pub is_active: bool,
    /// Informational only, not enforced
    pub requests_per_hour: u32,
    /// Informational only, not enforced
    pub requests_per_day: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
