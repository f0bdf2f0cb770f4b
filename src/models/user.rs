//! User account model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID (also used as document ID)
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Encoded PBKDF2 hash (see `services::password`)
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reservation of a unique value (username, email, API key hash).
///
/// The document ID is the reserved value itself, so creating the document
/// fails if someone else already holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueClaim {
    /// ID of the record holding the value
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}
