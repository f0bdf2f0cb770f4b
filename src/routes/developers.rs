// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Developer routes: registration issues an API key; the other routes are
//! authenticated with it.

use crate::error::Result;
use crate::middleware::api_key::AuthDeveloper;
use crate::models::developer::{DEFAULT_REQUESTS_PER_DAY, DEFAULT_REQUESTS_PER_HOUR};
use crate::models::Developer;
use crate::routes::json_body;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidateUrl, ValidationError};

/// Developer registration (no auth required).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/developers/register", post(register_developer))
}

/// Routes authenticated with `Authorization: Api-Key <key>`.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/developers/info", get(developer_info))
        .route("/api/developers/regenerate-key", post(regenerate_key))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeveloperRegistration {
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Ensure this field has between 1 and 100 characters."
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    pub company: String,
    #[serde(default)]
    #[validate(custom(function = "validate_website"))]
    pub website: String,
    #[serde(default)]
    pub description: String,
}

/// Website is optional, but must be a URL when given.
fn validate_website(website: &str) -> std::result::Result<(), ValidationError> {
    if website.is_empty() || website.validate_url() {
        Ok(())
    } else {
        Err(ValidationError::new("url").with_message(Cow::Borrowed("Enter a valid URL.")))
    }
}

/// Returned once at registration, including the new key.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ApiKeyResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub api_key: String,
    pub message: String,
    pub created_at: String,
}

/// Full developer record.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeveloperResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub company: String,
    pub website: String,
    pub description: String,
    pub api_key: String,
    pub is_active: bool,
    pub requests_per_hour: u32,
    pub requests_per_day: u32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Developer> for DeveloperResponse {
    fn from(developer: Developer) -> Self {
        Self {
            id: developer.id,
            email: developer.email,
            name: developer.name,
            company: developer.company,
            website: developer.website,
            description: developer.description,
            api_key: developer.api_key,
            is_active: developer.is_active,
            requests_per_hour: developer.requests_per_hour,
            requests_per_day: developer.requests_per_day,
            created_at: format_utc_rfc3339(developer.created_at),
            updated_at: format_utc_rfc3339(developer.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct RegeneratedKeyResponse {
    pub api_key: String,
    pub message: String,
}

/// Register a developer and issue their first API key.
async fn register_developer(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<DeveloperRegistration>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiKeyResponse>)> {
    let request = json_body(payload)?;
    request.validate()?;

    let now = Utc::now();
    let developer = Developer {
        id: uuid::Uuid::new_v4().to_string(),
        email: request.email.trim().to_string(),
        name: request.name,
        company: request.company,
        website: request.website,
        description: request.description,
        api_key: String::new(),
        is_active: true,
        requests_per_hour: DEFAULT_REQUESTS_PER_HOUR,
        requests_per_day: DEFAULT_REQUESTS_PER_DAY,
        created_at: now,
        updated_at: now,
    };
    let developer = state.db.create_developer(&developer).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyResponse {
            id: developer.id,
            email: developer.email,
            name: developer.name,
            api_key: developer.api_key,
            message: "Developer account created. Store your API key securely.".to_string(),
            created_at: format_utc_rfc3339(developer.created_at),
        }),
    ))
}

async fn developer_info(
    Extension(auth): Extension<AuthDeveloper>,
) -> Json<DeveloperResponse> {
    Json(auth.developer.into())
}

/// Replace the caller's API key. The key used for this request stops
/// working immediately.
async fn regenerate_key(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthDeveloper>,
) -> Result<Json<RegeneratedKeyResponse>> {
    let updated = state.db.regenerate_api_key(&auth.developer).await?;

    Ok(Json(RegeneratedKeyResponse {
        api_key: updated.api_key,
        message: "API key regenerated successfully".to_string(),
    }))
}
