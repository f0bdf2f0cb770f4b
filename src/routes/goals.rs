// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal routes. Every goal representation carries freshly computed progress.

use crate::db::ActivityRange;
use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::auth::AuthUser;
use crate::models::activity::round2;
use crate::models::{ActivityType, Goal, GoalPeriod, GoalProgress, GoalType};
use crate::routes::activities::has_two_decimals;
use crate::routes::{explicit_null, json_body, parse_choice, required};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// Targets must fit in 10 digits with 2 decimal places.
const TARGET_LIMIT: f64 = 100_000_000.0;

/// Goal routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals", get(list_goals).post(create_goal))
        .route(
            "/api/goals/{id}",
            get(get_goal)
                .put(replace_goal)
                .patch(update_goal)
                .delete(delete_goal),
        )
}

/// Goal as returned by the API.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GoalResponse {
    pub id: String,
    /// Owner's username
    pub user: String,
    pub goal_type: GoalType,
    pub target_value: f64,
    pub period: GoalPeriod,
    /// Empty when the goal counts every activity type
    pub activity_type: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start_date: NaiveDate,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub progress: GoalProgress,
}

impl GoalResponse {
    fn new(goal: Goal, username: &str, progress: GoalProgress) -> Self {
        Self {
            activity_type: goal
                .activity_type
                .map(|t| t.as_str().to_string())
                .unwrap_or_default(),
            id: goal.id,
            user: username.to_string(),
            goal_type: goal.goal_type,
            target_value: goal.target_value,
            period: goal.period,
            start_date: goal.start_date,
            end_date: goal.end_date,
            is_active: goal.is_active,
            created_at: format_utc_rfc3339(goal.created_at),
            updated_at: format_utc_rfc3339(goal.updated_at),
            progress,
        }
    }
}

/// Create/update body.
#[derive(Debug, Default, Deserialize)]
pub struct GoalPayload {
    pub goal_type: Option<String>,
    pub target_value: Option<f64>,
    pub period: Option<String>,
    /// `""` or `null` clears the filter
    #[serde(default, deserialize_with = "explicit_null")]
    pub activity_type: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Validate)]
pub struct GoalFields {
    pub goal_type: GoalType,
    #[validate(custom(function = "validate_target"))]
    pub target_value: f64,
    pub period: GoalPeriod,
    pub activity_type: Option<ActivityType>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

impl GoalPayload {
    /// Combine with the stored goal (if any) and validate the result.
    pub fn resolve(self, base: Option<&Goal>, partial: bool) -> Result<GoalFields> {
        let fallback = if partial { base } else { None };
        let mut errors = FieldErrors::new();

        let goal_type = match self.goal_type {
            Some(raw) => parse_choice(&raw, "goal_type", GoalType::parse, &mut errors),
            None => fallback.map(|g| g.goal_type),
        };
        let period = match self.period {
            Some(raw) => parse_choice(&raw, "period", GoalPeriod::parse, &mut errors),
            None => fallback.map(|g| g.period),
        };
        let activity_type = match self.activity_type {
            Some(Some(raw)) if !raw.is_empty() => {
                parse_choice(&raw, "activity_type", ActivityType::parse, &mut errors)
            }
            Some(_) => None,
            None => base.and_then(|g| g.activity_type),
        };

        let goal_type = required(goal_type, "goal_type", &mut errors);
        let target_value = required(
            self.target_value.or(fallback.map(|g| g.target_value)),
            "target_value",
            &mut errors,
        );
        let period = required(period, "period", &mut errors);
        let start_date = required(
            self.start_date.or(fallback.map(|g| g.start_date)),
            "start_date",
            &mut errors,
        );
        let end_date = required(
            self.end_date.or(fallback.map(|g| g.end_date)),
            "end_date",
            &mut errors,
        );

        let (Some(goal_type), Some(target_value), Some(period), Some(start_date), Some(end_date)) =
            (goal_type, target_value, period, start_date, end_date)
        else {
            return Err(AppError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let fields = GoalFields {
            goal_type,
            target_value,
            period,
            activity_type,
            start_date,
            end_date,
            is_active: self
                .is_active
                .or(base.map(|g| g.is_active))
                .unwrap_or(true),
        };
        fields.validate()?;

        if fields.end_date <= fields.start_date {
            return Err(AppError::field(
                "end_date",
                "End date must be after start date.",
            ));
        }
        Ok(fields)
    }
}

impl GoalFields {
    fn apply(self, goal: &mut Goal) {
        goal.goal_type = self.goal_type;
        goal.target_value = round2(self.target_value);
        goal.period = self.period;
        goal.activity_type = self.activity_type;
        goal.start_date = self.start_date;
        goal.end_date = self.end_date;
        goal.is_active = self.is_active;
    }
}

fn validate_target(target: f64) -> std::result::Result<(), ValidationError> {
    let message = if !target.is_finite() {
        "A valid number is required."
    } else if target.abs() >= TARGET_LIMIT {
        "Ensure that there are no more than 8 digits before the decimal point."
    } else if !has_two_decimals(target) {
        "Ensure that there are no more than 2 decimal places."
    } else {
        return Ok(());
    };
    Err(ValidationError::new("invalid_target").with_message(Cow::Borrowed(message)))
}

// ─── Handlers ────────────────────────────────────────────────

/// Compute progress for one goal from the store.
async fn progress_for(state: &AppState, goal: &Goal) -> Result<GoalProgress> {
    let range = ActivityRange {
        start: Some(goal.start_date),
        end: Some(goal.end_date),
        activity_type: goal.activity_type,
    };
    let activities = state
        .db
        .get_activities_for_user(&goal.user_id, range)
        .await?;
    Ok(goal.progress(&activities))
}

async fn owned_goal(state: &AppState, user: &AuthUser, id: &str) -> Result<Goal> {
    state
        .db
        .get_goal(id)
        .await?
        .filter(|g| g.user_id == user.user_id)
        .ok_or_else(|| AppError::NotFound(format!("Goal {} not found", id)))
}

/// List the caller's goals, newest first.
async fn list_goals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<GoalResponse>>> {
    let mut goals = state.db.get_goals_for_user(&user.user_id).await?;
    goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    // One query covering every goal's window; each goal filters its own share.
    let range = ActivityRange {
        start: goals.iter().map(|g| g.start_date).min(),
        end: goals.iter().map(|g| g.end_date).max(),
        activity_type: None,
    };
    let activities = if goals.is_empty() {
        Vec::new()
    } else {
        state
            .db
            .get_activities_for_user(&user.user_id, range)
            .await?
    };

    let results = goals
        .into_iter()
        .map(|goal| {
            let progress = goal.progress(&activities);
            GoalResponse::new(goal, &user.username, progress)
        })
        .collect();

    Ok(Json(results))
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<GoalPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<GoalResponse>)> {
    let fields = json_body(payload)?.resolve(None, false)?;

    let now = Utc::now();
    let mut goal = Goal {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        goal_type: fields.goal_type,
        target_value: fields.target_value,
        period: fields.period,
        activity_type: None,
        start_date: fields.start_date,
        end_date: fields.end_date,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    fields.apply(&mut goal);

    state.db.set_goal(&goal).await?;
    tracing::info!(user_id = %user.user_id, goal_id = %goal.id, "Goal created");

    let progress = progress_for(&state, &goal).await?;
    Ok((
        StatusCode::CREATED,
        Json(GoalResponse::new(goal, &user.username, progress)),
    ))
}

async fn get_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<GoalResponse>> {
    let goal = owned_goal(&state, &user, &id).await?;
    let progress = progress_for(&state, &goal).await?;
    Ok(Json(GoalResponse::new(goal, &user.username, progress)))
}

async fn save_changes(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: GoalPayload,
    partial: bool,
) -> Result<Json<GoalResponse>> {
    let mut goal = owned_goal(state, user, id).await?;
    let fields = payload.resolve(Some(&goal), partial)?;
    fields.apply(&mut goal);
    goal.updated_at = Utc::now();

    state.db.set_goal(&goal).await?;
    tracing::info!(user_id = %user.user_id, goal_id = %id, partial, "Goal updated");

    let progress = progress_for(state, &goal).await?;
    Ok(Json(GoalResponse::new(goal, &user.username, progress)))
}

async fn replace_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<GoalPayload>, JsonRejection>,
) -> Result<Json<GoalResponse>> {
    save_changes(&state, &user, &id, json_body(payload)?, false).await
}

async fn update_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<GoalPayload>, JsonRejection>,
) -> Result<Json<GoalResponse>> {
    save_changes(&state, &user, &id, json_body(payload)?, true).await
}

async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let goal = owned_goal(&state, &user, &id).await?;
    state.db.delete_goal(&goal.id).await?;
    tracing::info!(user_id = %user.user_id, goal_id = %id, "Goal deleted");
    Ok(StatusCode::NO_CONTENT)
}
