// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: registration, JWT issuance, profile and password management.

use crate::error::{AppError, FieldErrors, Result, NON_FIELD_ERRORS};
use crate::middleware::auth::{
    decode_token, issue_access_token, issue_token_pair, AuthUser, TokenPair, TokenType,
};
use crate::models::User;
use crate::routes::json_body;
use crate::services::password::password_problems;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

const BLANK: &str = "This field may not be blank.";

/// Routes that issue credentials (no auth required).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/token", post(obtain_token))
        .route("/api/token/refresh", post(refresh_token))
}

/// Account routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/auth/profile",
            get(get_profile).put(update_profile).patch(update_profile),
        )
        .route("/api/auth/change-password", post(change_password))
        .route("/api/auth/delete-account", delete(delete_account))
}

// ─── Representations ─────────────────────────────────────────

/// Public view of a user account.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            date_joined: format_utc_rfc3339(user.date_joined),
            created_at: format_utc_rfc3339(user.created_at),
            updated_at: format_utc_rfc3339(user.updated_at),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub refresh: String,
    pub access: String,
}

#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ─── Request Bodies ──────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password_confirm: String,
    #[serde(default)]
    #[validate(length(max = 30, message = "Ensure this field has no more than 30 characters."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 30, message = "Ensure this field has no more than 30 characters."))]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 30, message = "Ensure this field has no more than 30 characters."))]
    pub first_name: Option<String>,
    #[validate(length(max = 30, message = "Ensure this field has no more than 30 characters."))]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub old_password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub new_password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub confirm_password: String,
}

/// Usernames: 1 to 150 letters, digits and `@.+-_`.
fn validate_username(username: &str) -> std::result::Result<(), ValidationError> {
    let message = if username.is_empty() {
        BLANK
    } else if username.chars().count() > 150 {
        "Ensure this field has no more than 150 characters."
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
    } else {
        return Ok(());
    };
    Err(ValidationError::new("invalid_username").with_message(Cow::Borrowed(message)))
}

/// Collect validator errors and password rules into one field error map.
fn check_password_fields(
    validated: std::result::Result<(), validator::ValidationErrors>,
    password_field: &str,
    password: &str,
    username: &str,
) -> Result<()> {
    let mut fields = match validated {
        Ok(()) => FieldErrors::new(),
        Err(errors) => match AppError::from(errors) {
            AppError::Validation(fields) => fields,
            other => return Err(other),
        },
    };

    if !password.is_empty() {
        let problems = password_problems(password, username);
        if !problems.is_empty() {
            fields
                .entry(password_field.to_string())
                .or_default()
                .extend(problems);
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(fields))
    }
}

// ─── Handlers ────────────────────────────────────────────────

/// Create an account and return a token pair for it.
async fn register(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let request = json_body(payload)?;
    check_password_fields(
        request.validate(),
        "password",
        &request.password,
        &request.username,
    )?;
    if request.password != request.password_confirm {
        return Err(AppError::field(NON_FIELD_ERRORS, "Passwords don't match"));
    }

    let password_hash = state.passwords.hash_blocking(request.password).await?;

    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: request.username,
        email: request.email.trim().to_string(),
        first_name: request.first_name,
        last_name: request.last_name,
        password_hash,
        date_joined: now,
        created_at: now,
        updated_at: now,
    };
    state.db.create_user(&user).await?;

    let tokens = issue_token_pair(&user, &state.config)?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: user.into(),
            refresh: tokens.refresh,
            access: tokens.access,
        }),
    ))
}

/// Exchange username and password for an access/refresh pair.
async fn obtain_token(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenPair>> {
    let request = json_body(payload)?;

    let mut missing = FieldErrors::new();
    for (field, value) in [("username", &request.username), ("password", &request.password)] {
        if value.is_empty() {
            missing.insert(field.to_string(), vec![BLANK.to_string()]);
        }
    }
    if !missing.is_empty() {
        return Err(AppError::Validation(missing));
    }

    let user = state.db.get_user_by_username(&request.username).await?;
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let verified = state
        .passwords
        .check_blocking(request.password, stored_hash)
        .await?;

    let user = user.filter(|_| verified).ok_or_else(|| {
        tracing::warn!("Failed login attempt");
        AppError::InvalidCredentials
    })?;

    tracing::info!(user_id = %user.id, "Issued token pair");
    Ok(Json(issue_token_pair(&user, &state.config)?))
}

/// Exchange a refresh token for a new access token.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AccessTokenResponse>> {
    let request = json_body(payload)?;
    if request.refresh.is_empty() {
        return Err(AppError::field("refresh", BLANK));
    }

    let claims = decode_token(
        &request.refresh,
        &state.config.jwt_signing_key,
        TokenType::Refresh,
    )?;

    // Deleted accounts can't refresh
    if state.db.get_user(&claims.sub).await?.is_none() {
        return Err(AppError::InvalidToken);
    }

    let access = issue_access_token(&claims.sub, &claims.username, &state.config)?;
    Ok(Json(AccessTokenResponse { access }))
}

async fn current_user(state: &AppState, user: &AuthUser) -> Result<User> {
    state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    Ok(Json(current_user(&state, &user).await?.into()))
}

/// Update email and names. Both PUT and PATCH are partial.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<UserResponse>> {
    let update = json_body(payload)?;
    update.validate()?;

    let mut profile = current_user(&state, &user).await?;
    let previous_email = profile.email.clone();

    if let Some(email) = update.email {
        profile.email = email.trim().to_string();
    }
    if let Some(first_name) = update.first_name {
        profile.first_name = first_name;
    }
    if let Some(last_name) = update.last_name {
        profile.last_name = last_name;
    }
    profile.updated_at = Utc::now();

    state.db.update_user(&previous_email, &profile).await?;
    tracing::info!(user_id = %user.user_id, "Profile updated");

    Ok(Json(profile.into()))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let request = json_body(payload)?;
    check_password_fields(
        request.validate(),
        "new_password",
        &request.new_password,
        &user.username,
    )?;
    if request.new_password != request.confirm_password {
        return Err(AppError::field(NON_FIELD_ERRORS, "New passwords don't match"));
    }

    let mut profile = current_user(&state, &user).await?;
    let old_matches = state
        .passwords
        .check_blocking(request.old_password, Some(profile.password_hash.clone()))
        .await?;
    if !old_matches {
        return Err(AppError::BadRequest("Invalid old password".to_string()));
    }

    profile.password_hash = state.passwords.hash_blocking(request.new_password).await?;
    profile.updated_at = Utc::now();
    state.db.update_user(&profile.email, &profile).await?;
    tracing::info!(user_id = %user.user_id, "Password changed");

    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}

/// Delete the account and everything it owns.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode> {
    tracing::info!(user_id = %user.user_id, "User-initiated account deletion");

    let profile = current_user(&state, &user).await?;
    let deleted = state.db.delete_user_data(&profile).await?;

    tracing::info!(user_id = %user.user_id, deleted, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}
