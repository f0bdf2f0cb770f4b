//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{ActivityRange, ClaimKind, FirestoreDb};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ACTIVITIES: &str = "activities";
    pub const GOALS: &str = "goals";
    pub const DEVELOPERS: &str = "developers";
    /// Unique value reservations (usernames, emails, API key hashes)
    pub const UNIQUE_CLAIMS: &str = "unique_claims";
}
