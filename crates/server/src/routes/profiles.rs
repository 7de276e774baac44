//! User profile handlers.
//!
//! CRUD endpoints return plain serialized profiles. The settings endpoints
//! (`save-settings`, `delete-account`) answer with
//! `{"success": bool, "message": ..., "data"?, "errors"?}`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use fastprint_core::{ProfileId, ValidationErrors};

use super::extract::JsonBody;
use crate::error::{AppError, NOT_AUTHENTICATED, PERMISSION_DENIED, Result};
use crate::middleware::{MaybeUser, RequireAuth};
use crate::models::fields::Field;
use crate::models::profile::{ProfileFilter, ProfilePayload, ProfileView};
use crate::services::ServiceError;
use crate::services::profiles::ProfileService;
use crate::state::AppState;

fn service(state: &AppState) -> ProfileService<'_> {
    ProfileService::new(state.storage(), state.media())
}

/// Query parameters of the profile listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileQuery {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub search: Option<String>,
}

impl From<ProfileQuery> for ProfileFilter {
    fn from(query: ProfileQuery) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        Self {
            id: query.id.map(ProfileId::new),
            email: non_empty(query.email),
            username: non_empty(query.username),
            search: non_empty(query.search),
        }
    }
}

// =============================================================================
// CRUD
// =============================================================================

/// List and search profiles.
///
/// GET /api/userprofiles/
///
/// # Errors
///
/// Returns `500` if the query fails.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Vec<ProfileView>>> {
    let profiles = service(&state).list(query.into()).await?;
    Ok(Json(profiles.into_iter().map(ProfileView::from).collect()))
}

/// Create a profile.
///
/// POST /api/userprofiles/
///
/// # Errors
///
/// Returns `400` with field errors.
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ProfilePayload>,
) -> Result<(StatusCode, Json<ProfileView>)> {
    let profile = service(&state).create(payload).await?;
    Ok((StatusCode::CREATED, Json(profile.into())))
}

/// Get one profile.
///
/// GET /api/userprofiles/{id}/
///
/// # Errors
///
/// Returns `404` for an unknown id.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ProfileView>> {
    let profile = service(&state).get(ProfileId::new(id)).await?;
    Ok(Json(profile.into()))
}

/// Replace a profile. `email` is required.
///
/// PUT /api/userprofiles/{id}/
///
/// # Errors
///
/// Returns `404` for an unknown id, `400` with field errors, and `401`/`403`
/// when a password is set by someone other than the profile or staff.
#[instrument(skip(state, caller, payload))]
pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    MaybeUser(caller): MaybeUser,
    JsonBody(payload): JsonBody<ProfilePayload>,
) -> Result<Json<ProfileView>> {
    let profile = service(&state)
        .update(ProfileId::new(id), payload, false, caller.as_ref())
        .await?;
    Ok(Json(profile.into()))
}

/// Partially update a profile.
///
/// PATCH /api/userprofiles/{id}/
///
/// # Errors
///
/// Returns `404` for an unknown id, `400` with field errors, and `401`/`403`
/// for a refused password change.
#[instrument(skip(state, caller, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    MaybeUser(caller): MaybeUser,
    JsonBody(payload): JsonBody<ProfilePayload>,
) -> Result<Json<ProfileView>> {
    let profile = service(&state)
        .update(ProfileId::new(id), payload, true, caller.as_ref())
        .await?;
    Ok(Json(profile.into()))
}

/// Delete a profile with its cart and book projects.
///
/// DELETE /api/userprofiles/{id}/
///
/// # Errors
///
/// Returns `404` for an unknown id.
#[instrument(skip(state))]
pub async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    service(&state).delete(ProfileId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in user's profile, or `204` when none matches.
///
/// GET /api/userprofiles/me/
///
/// # Errors
///
/// Returns `401` when not logged in.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn me(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Response> {
    Ok(match service(&state).me(&user).await? {
        Some(profile) => Json(ProfileView::from(profile)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

// =============================================================================
// Account settings
// =============================================================================

/// Body of the settings endpoints.
#[derive(Debug, Serialize)]
pub struct Outcome {
    success: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<ProfileView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
}

impl Outcome {
    const fn success(message: &'static str, data: Option<ProfileView>) -> Self {
        Self {
            success: true,
            message,
            data,
            errors: None,
        }
    }

    const fn failure(message: &'static str) -> Self {
        Self {
            success: false,
            message,
            data: None,
            errors: None,
        }
    }
}

/// Render a service failure in the settings shape.
fn settings_failure(e: ServiceError) -> (StatusCode, Json<Outcome>) {
    let error = AppError::from(e);
    error.report();

    match error {
        AppError::Validation(errors) => (
            StatusCode::BAD_REQUEST,
            Json(Outcome {
                errors: Some(errors),
                ..Outcome::failure("Validation failed")
            }),
        ),
        AppError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(Outcome::failure("Profile not found")),
        ),
        AppError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            Json(Outcome::failure(NOT_AUTHENTICATED)),
        ),
        AppError::Forbidden => (
            StatusCode::FORBIDDEN,
            Json(Outcome::failure(PERMISSION_DENIED)),
        ),
        other => (other.status(), Json(Outcome::failure("An error occurred"))),
    }
}

/// Create or update the profile identified by email (or username).
///
/// POST /api/userprofiles/save-settings/
///
/// Changing an existing profile's password needs its own session or staff.
#[instrument(skip(state, caller, payload))]
pub async fn save_settings(
    State(state): State<AppState>,
    MaybeUser(caller): MaybeUser,
    JsonBody(mut payload): JsonBody<ProfilePayload>,
) -> (StatusCode, Json<Outcome>) {
    let email = match &payload.email {
        Field::Value(email) => email.trim().to_owned(),
        Field::Missing | Field::Null => String::new(),
    };
    if email.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(Outcome::failure("Email is required.")),
        );
    }
    payload.email = Field::Value(email);

    match service(&state).save_settings(payload, caller.as_ref()).await {
        Ok(saved) => {
            tracing::info!(
                profile_id = %saved.profile.id,
                created = saved.created,
                "Account settings saved"
            );
            (
                StatusCode::OK,
                Json(Outcome::success(
                    "Account settings saved successfully",
                    Some(saved.profile.into()),
                )),
            )
        }
        Err(e) => settings_failure(e),
    }
}

/// Delete a profile from the account settings page.
///
/// DELETE /api/userprofiles/{id}/delete-account/
#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> (StatusCode, Json<Outcome>) {
    match service(&state).delete(ProfileId::new(id)).await {
        Ok(()) => (
            StatusCode::OK,
            Json(Outcome::success("Account deleted successfully", None)),
        ),
        Err(e) => settings_failure(e),
    }
}
