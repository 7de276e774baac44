//! Session authentication handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::extract::JsonBody;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::session::CurrentUser;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Log in with email and password.
///
/// POST /api/auth/login
///
/// # Errors
///
/// Returns `401` for unknown emails, wrong passwords and profiles without a
/// usable password.
#[instrument(skip(state, session, req), fields(email = %req.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<CurrentUser>> {
    let auth = AuthService::new(state.storage().profiles.as_ref());

    let user = match auth.login(&req.email, &req.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login refused");
            return Err(AppError::InvalidCredentials);
        }
        Err(AuthError::Repository(e)) => return Err(e.into()),
        Err(AuthError::PasswordHash) => {
            return Err(AppError::Internal("password verification failed".to_owned()));
        }
    };

    set_current_user(&session, &user)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    tracing::info!(user_id = %user.id, "Logged in");
    Ok(Json(user))
}

/// Log out and destroy the session.
///
/// POST /api/auth/logout
#[instrument(skip(session))]
pub async fn logout(session: Session) -> StatusCode {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    clear_sentry_user();
    StatusCode::NO_CONTENT
}
