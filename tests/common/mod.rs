// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use fitness_tracker::config::Config;
use fitness_tracker::db::FirestoreDb;
use fitness_tracker::middleware::auth::{create_jwt, TokenType};
use fitness_tracker::routes::create_router;
use fitness_tracker::services::PasswordHasher;
use fitness_tracker::AppState;
use std::sync::Arc;

/// Cheap work factor so tests don't spend seconds hashing.
#[allow(dead_code)]
pub const TEST_PBKDF2_ITERATIONS: u32 = 1_000;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

#[allow(dead_code)]
fn build_app(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    build_app_with_passwords(db, PasswordHasher::new(TEST_PBKDF2_ITERATIONS))
}

#[allow(dead_code)]
fn build_app_with_passwords(
    db: FirestoreDb,
    passwords: PasswordHasher,
) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config: Config::test_default(),
        db,
        passwords,
    });
    (create_router(state.clone()), state)
}

/// Create a test app with an offline database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    build_app(test_db_offline())
}

/// Create an offline test app with a specific password work factor.
#[allow(dead_code)]
pub fn create_test_app_with_passwords(passwords: PasswordHasher) -> (axum::Router, Arc<AppState>) {
    build_app_with_passwords(test_db_offline(), passwords)
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    build_app(test_db().await)
}

/// Create an access token for a user.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, username: &str, signing_key: &[u8]) -> String {
    create_jwt(
        user_id,
        username,
        TokenType::Access,
        chrono::Duration::hours(1),
        signing_key,
    )
    .expect("Failed to create JWT")
}

/// Create a refresh token for a user.
#[allow(dead_code)]
pub fn create_test_refresh_jwt(user_id: &str, username: &str, signing_key: &[u8]) -> String {
    create_jwt(
        user_id,
        username,
        TokenType::Refresh,
        chrono::Duration::days(1),
        signing_key,
    )
    .expect("Failed to create JWT")
}

/// Build a JSON request, optionally with an Authorization header.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    authorization: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a bodyless request, optionally with an Authorization header.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
