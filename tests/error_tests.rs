// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use fitness_tracker::error::{AppError, FieldErrors};

mod common;
use common::body_json;

#[tokio::test]
async fn test_validation_error_body() {
    let mut fields = FieldErrors::new();
    fields.insert("duration".to_string(), vec!["Too small".to_string()]);
    fields.insert(
        "non_field_errors".to_string(),
        vec!["Passwords don't match".to_string()],
    );

    let response = AppError::Validation(fields).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["fields"]["duration"][0], "Too small");
    assert_eq!(json["fields"]["non_field_errors"][0], "Passwords don't match");
    assert!(json.get("details").is_none());
}

#[tokio::test]
async fn test_status_codes() {
    let cases = [
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED, "unauthorized"),
        (AppError::InvalidToken, StatusCode::UNAUTHORIZED, "invalid_token"),
        (
            AppError::NotFound("Goal g1 not found".to_string()),
            StatusCode::NOT_FOUND,
            "not_found",
        ),
        (
            AppError::BadRequest("Invalid old password".to_string()),
            StatusCode::BAD_REQUEST,
            "bad_request",
        ),
        (
            AppError::Database("unavailable".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
            "database_error",
        ),
        (
            AppError::Internal(anyhow::anyhow!("boom")),
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
        ),
    ];

    for (err, status, code) in cases {
        let response = err.into_response();
        assert_eq!(response.status(), status);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        let json = body_json(response).await;
        assert_eq!(json["error"], code);
    }
}

#[tokio::test]
async fn test_server_errors_hide_details() {
    let response = AppError::Database("connection string with secrets".to_string()).into_response();
    let json = body_json(response).await;
    assert!(json.get("details").is_none());
}

#[tokio::test]
async fn test_invalid_credentials_message() {
    let response = AppError::InvalidCredentials.into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_credentials");
    assert_eq!(
        json["details"],
        "No active account found with the given credentials"
    );
}

#[tokio::test]
async fn test_authentication_failed_challenges_api_key() {
    let response = AppError::AuthenticationFailed("Invalid API key.".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Api-Key"
    );

    let json = body_json(response).await;
    assert_eq!(json["error"], "authentication_failed");
    assert_eq!(json["details"], "Invalid API key.");
}
