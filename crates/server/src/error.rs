//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>` for plain resources and
//! `Result<T, EnvelopeError>` for the cart and book endpoints, which wrap
//! every body in `{"status": "success" | "error", ...}`. Server errors are
//! captured to Sentry before responding and never expose their details.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use fastprint_core::ValidationErrors;

use crate::db::RepositoryError;
use crate::media::MediaError;
use crate::services::ServiceError;

/// Body of every 401 response.
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";

/// Body of every 403 response.
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Field-level validation failed.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Upload could not be stored.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Resource not found (or not visible to the caller).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request conflicts with the resource's current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// User is not authenticated.
    #[error("Unauthorized")]
    Unauthorized,

    /// Login with an unknown email, a wrong password or an unusable password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// User is authenticated but not staff.
    #[error("Forbidden")]
    Forbidden,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload exceeds the configured body limit.
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(e.body_text())
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(errors) => Self::Validation(errors),
            ServiceError::NotFound(what) => Self::NotFound(not_found_message(what)),
            ServiceError::Conflict(message) => Self::Conflict(message),
            ServiceError::Repository(e) => Self::Database(e),
            ServiceError::Media(e) => Self::Media(e),
            ServiceError::Unauthenticated => Self::Unauthorized,
            ServiceError::Forbidden => Self::Forbidden,
            ServiceError::PasswordHash => Self::Internal("password hashing failed".to_owned()),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Database(_) | Self::Media(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this is a server-side failure.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Media(_) | Self::Internal(_))
    }

    /// Log and report server errors to Sentry.
    pub(crate) fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if let Self::Validation(errors) = self {
            tracing::warn!(fields = ?errors.fields().collect::<Vec<_>>(), "Validation errors");
        }
    }

    /// Client-facing message for non-validation errors.
    fn detail(&self) -> String {
        match self {
            Self::NotFound(message) | Self::Conflict(message) | Self::BadRequest(message) => {
                message.clone()
            }
            Self::Unauthorized => NOT_AUTHENTICATED.to_owned(),
            Self::InvalidCredentials => "Invalid email or password.".to_owned(),
            Self::Forbidden => PERMISSION_DENIED.to_owned(),
            Self::PayloadTooLarge => "Upload is too large.".to_owned(),
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Media(_) | Self::Internal(_) => {
                "Internal server error".to_owned()
            }
            Self::Validation(_) => "Validation failed".to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();

        let status = self.status();
        match self {
            Self::Validation(errors) => (status, Json(errors)).into_response(),
            other => (status, Json(json!({ "detail": other.detail() }))).into_response(),
        }
    }
}

/// `"cart item"` -> `"Cart item not found"`.
fn not_found_message(what: &str) -> String {
    let mut chars = what.chars();
    chars.next().map_or_else(
        || "Not found".to_owned(),
        |first| format!("{}{} not found", first.to_uppercase(), chars.as_str()),
    )
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// Status envelope errors
// =============================================================================

/// An [`AppError`] rendered inside the status envelope.
///
/// Server errors are replaced by the operation's generic `failure` message.
#[derive(Debug)]
pub struct EnvelopeError {
    error: AppError,
    failure: &'static str,
}

impl EnvelopeError {
    #[must_use]
    pub const fn new(error: AppError, failure: &'static str) -> Self {
        Self { error, failure }
    }
}

impl IntoResponse for EnvelopeError {
    fn into_response(self) -> Response {
        self.error.report();

        let status = self.error.status();
        let body = match self.error {
            AppError::Validation(errors) => json!({ "status": "error", "errors": errors }),
            ref e if e.is_server_error() => json!({ "status": "error", "message": self.failure }),
            ref e => json!({ "status": "error", "message": e.detail() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Attach a generic failure message to a fallible operation.
pub trait EnvelopeContext<T> {
    /// # Errors
    ///
    /// Returns the wrapped error.
    fn or_envelope(self, failure: &'static str) -> std::result::Result<T, EnvelopeError>;
}

impl<T, E: Into<AppError>> EnvelopeContext<T> for std::result::Result<T, E> {
    fn or_envelope(self, failure: &'static str) -> std::result::Result<T, EnvelopeError> {
        self.map_err(|e| EnvelopeError::new(e.into(), failure))
    }
}

// =============================================================================
// Sentry helpers
// =============================================================================

/// Set the Sentry user context after a successful login.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb that shows up in later Sentry error reports.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_owned(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}
