// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity routes: CRUD, filtered listings and metrics.

use crate::error::{AppError, FieldErrors, Result};
use crate::middleware::auth::AuthUser;
use crate::models::activity::round2;
use crate::models::{Activity, ActivityMetrics, ActivityType};
use crate::routes::{explicit_null, json_body, parse_choice, required};
use crate::services::activity::{paginate, ActivityQuery, Page};
use crate::time_utils::{format_utc_rfc3339, today_utc};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
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

/// Largest distance accepted, in km.
const MAX_DISTANCE_KM: f64 = 9999.99;

/// Activity routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(list_activities).post(create_activity))
        .route("/api/activities/history", get(activity_history))
        .route("/api/activities/metrics", get(activity_metrics))
        .route(
            "/api/activities/{id}",
            get(get_activity)
                .put(replace_activity)
                .patch(update_activity)
                .delete(delete_activity),
        )
}

// ─── Representations ─────────────────────────────────────────

/// Activity as returned by the API.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityResponse {
    pub id: String,
    /// Owner's username
    pub user: String,
    pub activity_type: ActivityType,
    pub duration: u32,
    pub distance: Option<f64>,
    pub calories_burned: Option<u32>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ActivityResponse {
    fn new(activity: Activity, username: &str) -> Self {
        Self {
            id: activity.id,
            user: username.to_string(),
            activity_type: activity.activity_type,
            duration: activity.duration,
            distance: activity.distance,
            calories_burned: activity.calories_burned,
            date: activity.date,
            notes: activity.notes,
            created_at: format_utc_rfc3339(activity.created_at),
            updated_at: format_utc_rfc3339(activity.updated_at),
        }
    }
}

/// Paginated listing with page numbers for navigation.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityListResponse {
    pub count: usize,
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub results: Vec<ActivityResponse>,
}

/// History listing; `next`/`previous` only say whether those pages exist.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityHistoryResponse {
    pub count: usize,
    pub next: bool,
    pub previous: bool,
    pub results: Vec<ActivityResponse>,
}

// ─── Request Bodies ──────────────────────────────────────────

/// Create/update body. Every field is optional here; which ones are
/// required depends on the method.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityPayload {
    pub activity_type: Option<String>,
    pub duration: Option<u32>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub distance: Option<Option<f64>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub calories_burned: Option<Option<u32>>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Fully resolved activity fields, validated before anything is stored.
#[derive(Debug, Clone, Validate)]
pub struct ActivityFields {
    pub activity_type: ActivityType,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub duration: u32,
    #[validate(custom(function = "validate_distance"))]
    pub distance: Option<f64>,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub calories_burned: Option<u32>,
    #[validate(custom(function = "validate_not_future"))]
    pub date: NaiveDate,
    #[validate(length(max = 500, message = "Ensure this field has no more than 500 characters."))]
    pub notes: String,
}

impl ActivityPayload {
    /// Combine with the stored record (if any) and validate.
    ///
    /// With `partial` set, missing required fields fall back to `base`.
    pub fn resolve(self, base: Option<&Activity>, partial: bool) -> Result<ActivityFields> {
        let fallback = if partial { base } else { None };
        let mut errors = FieldErrors::new();

        let activity_type = match self.activity_type {
            Some(raw) => parse_choice(&raw, "activity_type", ActivityType::parse, &mut errors),
            None => fallback.map(|a| a.activity_type),
        };
        let activity_type = required(activity_type, "activity_type", &mut errors);
        let duration = required(
            self.duration.or(fallback.map(|a| a.duration)),
            "duration",
            &mut errors,
        );
        let date = required(
            self.date.or(fallback.map(|a| a.date)),
            "date",
            &mut errors,
        );

        let (Some(activity_type), Some(duration), Some(date)) = (activity_type, duration, date)
        else {
            return Err(AppError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let fields = ActivityFields {
            activity_type,
            duration,
            distance: self
                .distance
                .unwrap_or_else(|| base.and_then(|a| a.distance)),
            calories_burned: self
                .calories_burned
                .unwrap_or_else(|| base.and_then(|a| a.calories_burned)),
            date,
            notes: self
                .notes
                .or_else(|| base.map(|a| a.notes.clone()))
                .unwrap_or_default(),
        };
        fields.validate()?;
        Ok(fields)
    }
}

impl ActivityFields {
    fn apply(self, activity: &mut Activity) {
        activity.activity_type = self.activity_type;
        activity.duration = self.duration;
        activity.distance = self.distance.map(round2);
        activity.calories_burned = self.calories_burned;
        activity.date = self.date;
        activity.notes = self.notes;
    }
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn validate_not_future(date: &NaiveDate) -> std::result::Result<(), ValidationError> {
    if *date > today_utc() {
        return Err(validation_error(
            "future_date",
            "Activity date cannot be in the future.",
        ));
    }
    Ok(())
}

/// Distance: 0.01..=9999.99 km with at most two decimal places.
fn validate_distance(distance: f64) -> std::result::Result<(), ValidationError> {
    if !distance.is_finite() {
        return Err(validation_error("invalid", "A valid number is required."));
    }
    if distance < 0.01 {
        return Err(validation_error(
            "min_value",
            "Ensure this value is greater than or equal to 0.01.",
        ));
    }
    if distance > MAX_DISTANCE_KM {
        return Err(validation_error(
            "max_digits",
            "Ensure that there are no more than 6 digits in total.",
        ));
    }
    if !has_two_decimals(distance) {
        return Err(validation_error(
            "max_decimal_places",
            "Ensure that there are no more than 2 decimal places.",
        ));
    }
    Ok(())
}

/// Whether a value has at most two decimal places (within float noise).
pub(crate) fn has_two_decimals(value: f64) -> bool {
    let scaled = value * 100.0;
    (scaled - scaled.round()).abs() < 1e-6
}

// ─── Handlers ────────────────────────────────────────────────

/// Fetch the caller's activities matching a query, filtered and sorted.
async fn query_activities(
    state: &AppState,
    user: &AuthUser,
    params: &ActivityQuery,
) -> Result<Vec<Activity>> {
    let filter = params.filter();
    if filter.matches_nothing() {
        return Ok(Vec::new());
    }

    let activities = state
        .db
        .get_activities_for_user(&user.user_id, filter.range)
        .await?;
    let mut activities = filter.apply(activities);
    params.ordering().sort(&mut activities);
    Ok(activities)
}

fn page_results(page: Page<Activity>, username: &str) -> Vec<ActivityResponse> {
    page.items
        .into_iter()
        .map(|a| ActivityResponse::new(a, username))
        .collect()
}

/// List the caller's activities.
async fn list_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivityQuery>,
) -> Result<Json<ActivityListResponse>> {
    let page_request = params.page_request()?;
    let activities = query_activities(&state, &user, &params).await?;
    let page = paginate(activities, page_request);

    tracing::debug!(
        user_id = %user.user_id,
        count = page.count,
        page = page.number,
        "Listed activities"
    );

    Ok(Json(ActivityListResponse {
        count: page.count,
        next: page.next_number(),
        previous: page.previous_number(),
        results: page_results(page, &user.username),
    }))
}

/// Activity history: date/type filters, ordering and pagination.
async fn activity_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivityQuery>,
) -> Result<Json<ActivityHistoryResponse>> {
    let params = ActivityQuery {
        start_date: params.start_date,
        end_date: params.end_date,
        activity_type: params.activity_type,
        ordering: params.ordering,
        page: params.page,
        page_size: params.page_size,
        ..Default::default()
    };
    let page_request = params.page_request()?;
    let activities = query_activities(&state, &user, &params).await?;
    let page = paginate(activities, page_request);

    Ok(Json(ActivityHistoryResponse {
        count: page.count,
        next: page.has_next(),
        previous: page.has_previous(),
        results: page_results(page, &user.username),
    }))
}

/// Filters accepted by the metrics endpoint.
#[derive(Debug, Deserialize)]
struct MetricsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    activity_type: Option<String>,
}

/// Aggregate metrics over the caller's activities.
async fn activity_metrics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<MetricsQuery>,
) -> Result<Json<ActivityMetrics>> {
    let params = ActivityQuery {
        start_date: params.start_date,
        end_date: params.end_date,
        activity_type: params.activity_type,
        ..Default::default()
    };
    let activities = query_activities(&state, &user, &params).await?;
    let metrics = ActivityMetrics::from_activities(&activities);

    tracing::debug!(
        user_id = %user.user_id,
        total_activities = metrics.total_activities,
        "Computed activity metrics"
    );

    Ok(Json(metrics))
}

/// Load an activity owned by the caller. Other users' activities are 404.
async fn owned_activity(state: &AppState, user: &AuthUser, id: &str) -> Result<Activity> {
    state
        .db
        .get_activity(id)
        .await?
        .filter(|a| a.user_id == user.user_id)
        .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))
}

/// Log a new activity.
async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<ActivityPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<ActivityResponse>)> {
    let fields = json_body(payload)?.resolve(None, false)?;

    let now = Utc::now();
    let mut activity = Activity {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        activity_type: fields.activity_type,
        duration: fields.duration,
        distance: None,
        calories_burned: None,
        date: fields.date,
        notes: String::new(),
        created_at: now,
        updated_at: now,
    };
    fields.apply(&mut activity);

    state.db.set_activity(&activity).await?;
    tracing::info!(
        user_id = %user.user_id,
        activity_id = %activity.id,
        activity_type = %activity.activity_type,
        "Activity created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ActivityResponse::new(activity, &user.username)),
    ))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ActivityResponse>> {
    let activity = owned_activity(&state, &user, &id).await?;
    Ok(Json(ActivityResponse::new(activity, &user.username)))
}

async fn save_changes(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: ActivityPayload,
    partial: bool,
) -> Result<Json<ActivityResponse>> {
    let mut activity = owned_activity(state, user, id).await?;
    let fields = payload.resolve(Some(&activity), partial)?;
    fields.apply(&mut activity);
    activity.updated_at = Utc::now();

    state.db.set_activity(&activity).await?;
    tracing::info!(user_id = %user.user_id, activity_id = %id, partial, "Activity updated");

    Ok(Json(ActivityResponse::new(activity, &user.username)))
}

/// Full update (PUT).
async fn replace_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ActivityPayload>, JsonRejection>,
) -> Result<Json<ActivityResponse>> {
    save_changes(&state, &user, &id, json_body(payload)?, false).await
}

/// Partial update (PATCH).
async fn update_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ActivityPayload>, JsonRejection>,
) -> Result<Json<ActivityResponse>> {
    save_changes(&state, &user, &id, json_body(payload)?, true).await
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let activity = owned_activity(&state, &user, &id).await?;
    state.db.delete_activity(&activity.id).await?;
    tracing::info!(user_id = %user.user_id, activity_id = %id, "Activity deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> ActivityPayload {
        serde_json::from_str(json).unwrap()
    }

    fn field_errors(result: Result<ActivityFields>) -> FieldErrors {
        match result {
            Err(AppError::Validation(fields)) => fields,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    fn stored() -> Activity {
        let now = Utc::now();
        Activity {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            activity_type: ActivityType::Running,
            duration: 30,
            distance: Some(5.0),
            calories_burned: Some(200),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            notes: "easy".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_payload_resolves() {
        let fields = payload(
            r#"{"activity_type": "cycling", "duration": 60, "distance": 20.5, "date": "2025-01-10"}"#,
        )
        .resolve(None, false)
        .unwrap();

        assert_eq!(fields.activity_type, ActivityType::Cycling);
        assert_eq!(fields.distance, Some(20.5));
        assert_eq!(fields.calories_burned, None);
        assert_eq!(fields.notes, "");
    }

    #[test]
    fn test_missing_required_fields() {
        let errors = field_errors(payload("{}").resolve(None, false));
        assert!(errors.contains_key("activity_type"));
        assert!(errors.contains_key("duration"));
        assert!(errors.contains_key("date"));
    }

    #[test]
    fn test_invalid_choice() {
        let errors = field_errors(
            payload(r#"{"activity_type": "curling", "duration": 10, "date": "2025-01-10"}"#)
                .resolve(None, false),
        );
        assert_eq!(
            errors["activity_type"],
            vec!["\"curling\" is not a valid choice.".to_string()]
        );
    }

    #[test]
    fn test_future_date_rejected() {
        let tomorrow = today_utc().succ_opt().unwrap();
        let json = format!(
            r#"{{"activity_type": "yoga", "duration": 10, "date": "{}"}}"#,
            tomorrow
        );
        let errors = field_errors(payload(&json).resolve(None, false));
        assert_eq!(
            errors["date"],
            vec!["Activity date cannot be in the future.".to_string()]
        );
    }

    #[test]
    fn test_field_rules() {
        let errors = field_errors(
            payload(
                r#"{"activity_type": "running", "duration": 0, "distance": 1.234,
                    "calories_burned": 0, "date": "2025-01-10"}"#,
            )
            .resolve(None, false),
        );
        assert!(errors.contains_key("duration"));
        assert!(errors.contains_key("calories_burned"));
        assert_eq!(
            errors["distance"],
            vec!["Ensure that there are no more than 2 decimal places.".to_string()]
        );

        let too_long = "x".repeat(501);
        let json = format!(
            r#"{{"activity_type": "running", "duration": 5, "date": "2025-01-10", "notes": "{}"}}"#,
            too_long
        );
        let errors = field_errors(payload(&json).resolve(None, false));
        assert!(errors.contains_key("notes"));
    }

    #[test]
    fn test_distance_bounds() {
        assert!(validate_distance(0.01).is_ok());
        assert!(validate_distance(9999.99).is_ok());
        assert!(validate_distance(0.0).is_err());
        assert!(validate_distance(10000.0).is_err());
        assert!(validate_distance(f64::NAN).is_err());
        assert!(has_two_decimals(40.25));
        assert!(!has_two_decimals(40.255));
    }

    #[test]
    fn test_patch_merges_with_stored_record() {
        let base = stored();
        let fields = payload(r#"{"duration": 45, "distance": null}"#)
            .resolve(Some(&base), true)
            .unwrap();

        assert_eq!(fields.activity_type, ActivityType::Running);
        assert_eq!(fields.duration, 45);
        assert_eq!(fields.distance, None);
        assert_eq!(fields.calories_burned, Some(200));
        assert_eq!(fields.notes, "easy");
    }

    #[test]
    fn test_put_requires_all_required_fields() {
        let base = stored();
        let errors = field_errors(payload(r#"{"duration": 45}"#).resolve(Some(&base), false));
        assert!(errors.contains_key("activity_type"));
        assert!(errors.contains_key("date"));
        assert!(!errors.contains_key("duration"));
    }

    #[test]
    fn test_response_shape() {
        let response = ActivityResponse::new(stored(), "alice");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["user"], "alice");
        assert_eq!(json["activity_type"], "running");
        assert_eq!(json["date"], "2025-03-01");
        assert_eq!(json["distance"], 5.0);
        assert!(json.get("user_id").is_none());
    }
}
