//! Authentication extractors.
//!
//! The session only holds the logged-in profile's id under
//! [`keys::PROFILE_ID`]. Every extraction reloads the profile, so a staff
//! revocation or a deleted account takes effect on the next request.
//! Handlers take the identity through [`RequireAuth`], [`RequireStaff`] for
//! the admin endpoints, or [`MaybeUser`] where anonymous callers are allowed.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use fastprint_core::ProfileId;

use crate::error::AppError;
use crate::models::session::{CurrentUser, keys};
use crate::services::auth::identity;
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// Rejects with `401` and `{"detail": ...}` when nobody is logged in.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> String {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        current_user(parts, state)
            .await?
            .map(Self)
            .ok_or(AppError::Unauthorized)
    }
}

/// Extractor that requires a logged-in staff member.
///
/// Rejects with `401` when nobody is logged in and `403` for customers.
pub struct RequireStaff(pub CurrentUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, state)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if !user.is_staff {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Staff route refused");
            return Err(AppError::Forbidden);
        }
        Ok(Self(user))
    }
}

/// The logged-in user, if any. Only fails when the profile lookup does.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        current_user(parts, state).await.map(Self)
    }
}

async fn current_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    // Set by SessionManagerLayer
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    let Some(id) = session
        .get::<ProfileId>(keys::PROFILE_ID)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    match state.storage().profiles.find(id).await? {
        Some(profile) => Ok(Some(identity(&profile))),
        None => {
            tracing::info!(profile_id = %id, "Session profile is gone, clearing session");
            if let Err(e) = session.flush().await {
                tracing::error!("Failed to clear session: {}", e);
            }
            Ok(None)
        }
    }
}

/// Store the logged-in profile's id in the session.
///
/// The session ID is cycled first so a pre-login session cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::PROFILE_ID, user.id).await
}

/// Remove the logged-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
