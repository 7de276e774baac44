//! User profile domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fastprint_core::validation::NOT_NULL;
use fastprint_core::{AccountType, Email, ProfileId, ValidationErrors};

use super::fields::{self, BLANK, Field};

/// Maximum length of names and usernames.
pub const NAME_MAX: usize = 150;

/// A user profile (account record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: ProfileId,
    pub email: Email,
    /// Not unique. Lookups by username take the lowest id.
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Argon2 PHC string, or `None` for an unusable password.
    pub password_hash: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub account_type: Option<AccountType>,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Whether password login is possible for this account.
    #[must_use]
    pub const fn has_usable_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Input for creating a profile.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub email: Email,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub account_type: Option<AccountType>,
}

/// Exact-match and free-text filters for listing profiles.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub id: Option<ProfileId>,
    pub email: Option<String>,
    pub username: Option<String>,
    /// Case-insensitive substring over email, username and names.
    pub search: Option<String>,
}

impl ProfileFilter {
    /// Filter for a single email address.
    #[must_use]
    pub fn by_email(email: &str) -> Self {
        Self {
            email: Some(email.to_owned()),
            ..Self::default()
        }
    }

    /// Filter for a username.
    #[must_use]
    pub fn by_username(username: &str) -> Self {
        Self {
            username: Some(username.to_owned()),
            ..Self::default()
        }
    }

    /// Whether `profile` passes every filter that is set.
    #[must_use]
    pub fn matches(&self, profile: &Profile) -> bool {
        if self.id.is_some_and(|id| id != profile.id) {
            return false;
        }
        if self
            .email
            .as_deref()
            .is_some_and(|email| email != profile.email.as_str())
        {
            return false;
        }
        if self
            .username
            .as_deref()
            .is_some_and(|username| username != profile.username)
        {
            return false;
        }
        match self.search.as_deref() {
            Some(term) => {
                let term = term.to_lowercase();
                [
                    Some(profile.email.as_str()),
                    Some(profile.username.as_str()),
                    profile.first_name.as_deref(),
                    profile.last_name.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|value| value.to_lowercase().contains(&term))
            }
            None => true,
        }
    }
}

/// Explicit partial update of a profile.
///
/// Outer `None` leaves a field alone; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub email: Option<Email>,
    /// `Some(None)` re-derives the username from the email.
    pub username: Option<Option<String>>,
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub state: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub postal_code: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub phone_number: Option<Option<String>>,
    pub account_type: Option<Option<AccountType>>,
}

impl ProfilePatch {
    /// Apply the patch to `profile`.
    pub fn apply(self, profile: &mut Profile) {
        if let Some(email) = self.email {
            profile.email = email;
        }
        if let Some(username) = self.username {
            profile.username = username.unwrap_or_else(|| profile.email.local_part().to_owned());
        }
        if let Some(value) = self.first_name {
            profile.first_name = value;
        }
        if let Some(value) = self.last_name {
            profile.last_name = value;
        }
        if let Some(value) = self.country {
            profile.country = value;
        }
        if let Some(value) = self.state {
            profile.state = value;
        }
        if let Some(value) = self.city {
            profile.city = value;
        }
        if let Some(value) = self.postal_code {
            profile.postal_code = value;
        }
        if let Some(value) = self.address {
            profile.address = value;
        }
        if let Some(value) = self.phone_number {
            profile.phone_number = value;
        }
        if let Some(value) = self.account_type {
            profile.account_type = value;
        }
    }

    /// Build creation input, deriving the username when none was given.
    #[must_use]
    pub fn into_new(self, email: Email, password_hash: Option<String>) -> NewProfile {
        let username = self
            .username
            .flatten()
            .unwrap_or_else(|| email.local_part().to_owned());

        NewProfile {
            email,
            username,
            first_name: self.first_name.flatten(),
            last_name: self.last_name.flatten(),
            password_hash,
            country: self.country.flatten(),
            state: self.state.flatten(),
            city: self.city.flatten(),
            postal_code: self.postal_code.flatten(),
            address: self.address.flatten(),
            phone_number: self.phone_number.flatten(),
            account_type: self.account_type.flatten(),
        }
    }
}

/// Validated profile write: field changes plus an optional new password.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub patch: ProfilePatch,
    /// Plain-text password, only when a non-empty one was supplied.
    pub password: Option<String>,
}

/// Profile body accepted by create, update and save-settings.
///
/// Read-only fields (`id`, `is_staff`, timestamps) are ignored if sent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfilePayload {
    pub email: Field<String>,
    pub username: Field<String>,
    pub first_name: Field<String>,
    pub last_name: Field<String>,
    pub password: Field<String>,
    pub country: Field<String>,
    pub state: Field<String>,
    pub city: Field<String>,
    pub postal_code: Field<String>,
    pub address: Field<String>,
    pub phone_number: Field<String>,
    pub account_type: Field<String>,
}

impl ProfilePayload {
    /// Validate the supplied fields.
    ///
    /// # Errors
    ///
    /// Returns field-keyed errors for malformed email, over-long names and
    /// unknown account types.
    pub fn into_changes(self) -> Result<ProfileChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = parse_email(&mut errors, self.email);
        let username = fields::nullable_text(&mut errors, "username", self.username, Some(NAME_MAX));
        let first_name =
            fields::nullable_text(&mut errors, "first_name", self.first_name, Some(NAME_MAX));
        let last_name =
            fields::nullable_text(&mut errors, "last_name", self.last_name, Some(NAME_MAX));
        let account_type = parse_account_type(&mut errors, self.account_type);

        let password = match self.password {
            Field::Value(password) if !password.is_empty() => Some(password),
            _ => None,
        };

        let patch = ProfilePatch {
            email,
            username,
            first_name,
            last_name,
            country: fields::nullable_text(&mut errors, "country", self.country, None),
            state: fields::nullable_text(&mut errors, "state", self.state, None),
            city: fields::nullable_text(&mut errors, "city", self.city, None),
            postal_code: fields::nullable_text(&mut errors, "postal_code", self.postal_code, None),
            address: fields::nullable_text(&mut errors, "address", self.address, None),
            phone_number: fields::nullable_text(&mut errors, "phone_number", self.phone_number, None),
            account_type,
        };

        errors.into_result(ProfileChanges { patch, password })
    }
}

fn parse_email(errors: &mut ValidationErrors, field: Field<String>) -> Option<Email> {
    match field {
        Field::Missing => None,
        Field::Null => {
            errors.add("email", NOT_NULL);
            None
        }
        Field::Value(raw) if raw.trim().is_empty() => {
            errors.add("email", BLANK);
            None
        }
        Field::Value(raw) => match Email::parse(raw.trim()) {
            Ok(email) => Some(email),
            Err(_) => {
                errors.add("email", "Enter a valid email address.");
                None
            }
        },
    }
}

fn parse_account_type(
    errors: &mut ValidationErrors,
    field: Field<String>,
) -> Option<Option<AccountType>> {
    match field {
        Field::Missing => None,
        Field::Null => Some(None),
        Field::Value(raw) if raw.is_empty() => Some(None),
        Field::Value(raw) => match raw.parse::<AccountType>() {
            Ok(account_type) => Some(Some(account_type)),
            Err(_) => {
                errors.add("account_type", format!("\"{raw}\" is not a valid choice."));
                None
            }
        },
    }
}

/// Serialized profile. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: ProfileId,
    pub username: String,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub account_type: Option<AccountType>,
    pub is_staff: bool,
    pub has_usable_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        let has_usable_password = profile.has_usable_password();
        Self {
            id: profile.id,
            username: profile.username,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            country: profile.country,
            state: profile.state,
            city: profile.city,
            postal_code: profile.postal_code,
            address: profile.address,
            phone_number: profile.phone_number,
            account_type: profile.account_type,
            is_staff: profile.is_staff,
            has_usable_password,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}
