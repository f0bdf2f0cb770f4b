// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod accounts;
pub mod activities;
pub mod developers;
pub mod goals;

use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::{require_api_key, require_auth};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Welcome message listing the endpoint groups.
async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the Fitness Tracker API",
        "available_endpoints": {
            "auth": "/api/auth/",
            "activities": "/api/activities/",
            "goals": "/api/goals/",
            "developers": "/api/developers/",
            "token": "/api/token",
            "token_refresh": "/api/token/refresh",
        }
    }))
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .merge(accounts::public_routes())
        .merge(developers::public_routes());

    // User routes (JWT required)
    let protected_routes = Router::new()
        .merge(accounts::routes())
        .merge(activities::routes())
        .merge(goals::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Developer routes (API key required)
    let developer_routes = developers::routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(developer_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

// ─── Request Body Helpers ────────────────────────────────────

const REQUIRED: &str = "This field is required.";

/// Unwrap a JSON body, reporting malformed input as a 400.
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Record a "required" error if `value` is missing and the field has no
/// other error yet.
pub(crate) fn required<T>(value: Option<T>, field: &str, errors: &mut FieldErrors) -> Option<T> {
    if value.is_none() && !errors.contains_key(field) {
        errors.insert(field.to_string(), vec![REQUIRED.to_string()]);
    }
    value
}

/// Parse a choice field, recording an error for unknown values.
pub(crate) fn parse_choice<T>(
    raw: &str,
    field: &str,
    parse: impl Fn(&str) -> Option<T>,
    errors: &mut FieldErrors,
) -> Option<T> {
    let parsed = parse(raw);
    if parsed.is_none() {
        errors
            .entry(field.to_string())
            .or_default()
            .push(format!("\"{}\" is not a valid choice.", raw));
    }
    parsed
}

/// Distinguish an explicit `null` from an absent field in partial updates.
///
/// Use with `#[serde(default, deserialize_with = "explicit_null")]` on an
/// `Option<Option<T>>`.
pub(crate) fn explicit_null<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "explicit_null")]
        distance: Option<Option<f64>>,
    }

    #[test]
    fn test_explicit_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.distance, None);

        let null: Patch = serde_json::from_str(r#"{"distance": null}"#).unwrap();
        assert_eq!(null.distance, Some(None));

        let value: Patch = serde_json::from_str(r#"{"distance": 5.5}"#).unwrap();
        assert_eq!(value.distance, Some(Some(5.5)));
    }

    #[test]
    fn test_required_does_not_stack_errors() {
        let mut errors = FieldErrors::new();
        let parsed = parse_choice("curling", "activity_type", |_| None::<u8>, &mut errors);
        required(parsed, "activity_type", &mut errors);
        required(None::<u32>, "duration", &mut errors);

        assert_eq!(
            errors["activity_type"],
            vec!["\"curling\" is not a valid choice.".to_string()]
        );
        assert_eq!(errors["duration"], vec![REQUIRED.to_string()]);
    }
}
