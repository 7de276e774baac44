//! Session-related types.
//!
//! The session stores only the profile id; [`CurrentUser`] is rebuilt from
//! the profile on every request.

use serde::Serialize;

use fastprint_core::{Email, ProfileId};

/// Identity of the logged-in profile.
///
/// Handlers never see a password or a token, only this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    /// Profile database ID.
    pub id: ProfileId,
    /// Profile email address.
    pub email: Email,
    /// Current username.
    pub username: String,
    /// Whether the profile may use the admin endpoints.
    pub is_staff: bool,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the logged-in profile's id.
    pub const PROFILE_ID: &str = "profile_id";
}
