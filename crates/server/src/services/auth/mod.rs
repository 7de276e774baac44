//! Authentication service.
//!
//! Password login against profiles. A profile whose password is unusable
//! (`password_hash` is `None`) can never log in.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::db::Repository;
use crate::models::profile::{Profile, ProfileFilter};
use crate::models::session::CurrentUser;

/// Authentication service.
pub struct AuthService<'a> {
    profiles: &'a dyn Repository<Profile>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(profiles: &'a dyn Repository<Profile>) -> Self {
        Self { profiles }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown, the
    /// password is wrong, or the profile has no usable password.
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let profile = self
            .profiles
            .filter(&ProfileFilter::by_email(email.trim()))
            .await?
            .into_iter()
            .next()
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = profile
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)?;

        Ok(identity(&profile))
    }
}

/// Session identity for a profile.
#[must_use]
pub fn identity(profile: &Profile) -> CurrentUser {
    CurrentUser {
        id: profile.id,
        email: profile.email.clone(),
        username: profile.username.clone(),
        is_staff: profile.is_staff,
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use fastprint_core::{Email, ProfileId};

    use super::*;
    use crate::db::MemoryRepository;
    use crate::models::profile::NewProfile;

    fn new_profile(email: &str, password_hash: Option<String>) -> NewProfile {
        let email = Email::parse(email).unwrap();
        NewProfile {
            username: email.local_part().to_owned(),
            email,
            first_name: None,
            last_name: None,
            password_hash,
            country: None,
            state: None,
            city: None,
            postal_code: None,
            address: None,
            phone_number: None,
            account_type: None,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login() {
        let repo = MemoryRepository::<Profile>::new();
        let hash = hash_password("s3cret-pass").unwrap();
        let profile = repo
            .insert(new_profile("reader@example.com", Some(hash)))
            .await
            .unwrap();

        let auth = AuthService::new(&repo);
        let user = auth.login("reader@example.com", "s3cret-pass").await.unwrap();
        assert_eq!(user.id, profile.id);
        assert_eq!(user.username, "reader");
        assert!(!user.is_staff);

        assert!(matches!(
            auth.login("reader@example.com", "nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "s3cret-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_unusable_password_never_logs_in() {
        let repo = MemoryRepository::<Profile>::new();
        repo.insert(new_profile("guest@example.com", None))
            .await
            .unwrap();

        let auth = AuthService::new(&repo);
        assert!(matches!(
            auth.login("guest@example.com", "").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_identity_copies_staff_flag() {
        let now = Utc::now();
        let profile = Profile {
            id: ProfileId::new(4),
            email: Email::parse("ops@example.com").unwrap(),
            username: "ops".to_owned(),
            first_name: None,
            last_name: None,
            password_hash: None,
            country: None,
            state: None,
            city: None,
            postal_code: None,
            address: None,
            phone_number: None,
            account_type: None,
            is_staff: true,
            created_at: now,
            updated_at: now,
        };
        let user = identity(&profile);
        assert!(user.is_staff);
        assert_eq!(user.email.as_str(), "ops@example.com");
    }
}
