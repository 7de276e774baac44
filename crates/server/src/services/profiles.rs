//! Profile service.

use fastprint_core::validation::REQUIRED;
use fastprint_core::{ProfileId, ValidationErrors};

use super::ServiceError;
use super::auth::hash_password;
use crate::db::{Repository, RepositoryError, Storage};
use crate::media::MediaStore;
use crate::models::book::BookProjectFilter;
use crate::models::cart::CartItemFilter;
use crate::models::fields::Field;
use crate::models::profile::{Profile, ProfileChanges, ProfileFilter, ProfilePayload};
use crate::models::session::CurrentUser;

const DUPLICATE_EMAIL: &str = "user profile with this email already exists.";

/// Outcome of the settings upsert.
#[derive(Debug)]
pub struct SavedSettings {
    pub profile: Profile,
    pub created: bool,
}

/// Profile operations.
pub struct ProfileService<'a> {
    storage: &'a Storage,
    media: &'a MediaStore,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(storage: &'a Storage, media: &'a MediaStore) -> Self {
        Self { storage, media }
    }

    fn repo(&self) -> &dyn Repository<Profile> {
        self.storage.profiles.as_ref()
    }

    /// List profiles.
    ///
    /// When `search` equals some profile's email exactly, only the exact
    /// match(es) are returned.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self, filter: ProfileFilter) -> Result<Vec<Profile>, ServiceError> {
        if let Some(term) = filter.search.as_deref()
            && filter.email.as_deref().is_none_or(|email| email == term)
        {
            let exact = ProfileFilter {
                email: Some(term.to_owned()),
                search: None,
                ..filter.clone()
            };
            let matches = self.repo().filter(&exact).await?;
            if !matches.is_empty() {
                return Ok(matches);
            }
        }

        Ok(self.repo().filter(&filter).await?)
    }

    /// Get a profile by ID.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if it does not exist.
    pub async fn get(&self, id: ProfileId) -> Result<Profile, ServiceError> {
        self.repo()
            .find(id)
            .await?
            .ok_or(ServiceError::NotFound("profile"))
    }

    /// Create a profile from a payload.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a missing, invalid or taken
    /// email and other field errors.
    pub async fn create(&self, payload: ProfilePayload) -> Result<Profile, ServiceError> {
        let changes = payload.into_changes()?;
        self.create_from(changes).await
    }

    async fn create_from(&self, changes: ProfileChanges) -> Result<Profile, ServiceError> {
        let ProfileChanges { patch, password } = changes;
        let Some(email) = patch.email.clone() else {
            return Err(ValidationErrors::single("email", REQUIRED).into());
        };

        let password_hash = password
            .as_deref()
            .map(hash_password)
            .transpose()
            .map_err(|_| ServiceError::PasswordHash)?;

        let profile = self
            .repo()
            .insert(patch.into_new(email, password_hash))
            .await
            .map_err(duplicate_email)?;

        tracing::info!(profile_id = %profile.id, "Profile created");
        Ok(profile)
    }

    /// Update a profile. A full update (`partial == false`) requires `email`.
    ///
    /// A new password is only accepted from the profile itself or staff.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown id,
    /// `ServiceError::Validation` for field errors, and
    /// `ServiceError::Unauthenticated` or `ServiceError::Forbidden` for a
    /// password change by anyone else.
    pub async fn update(
        &self,
        id: ProfileId,
        payload: ProfilePayload,
        partial: bool,
        caller: Option<&CurrentUser>,
    ) -> Result<Profile, ServiceError> {
        let changes = payload.into_changes()?;
        if !partial && changes.patch.email.is_none() {
            return Err(ValidationErrors::single("email", REQUIRED).into());
        }

        let profile = self.get(id).await?;
        self.apply(profile, changes, caller).await
    }

    async fn apply(
        &self,
        mut profile: Profile,
        changes: ProfileChanges,
        caller: Option<&CurrentUser>,
    ) -> Result<Profile, ServiceError> {
        let ProfileChanges { patch, password } = changes;

        if let Some(password) = password {
            check_password_change(caller, &profile)?;
            profile.password_hash =
                Some(hash_password(&password).map_err(|_| ServiceError::PasswordHash)?);
        }
        patch.apply(&mut profile);

        let saved = self.repo().save(&profile).await.map_err(duplicate_email)?;
        tracing::info!(profile_id = %saved.id, "Profile updated");
        Ok(saved)
    }

    /// Delete a profile together with its cart items and book projects.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if it does not exist.
    pub async fn delete(&self, id: ProfileId) -> Result<(), ServiceError> {
        let profile = self.get(id).await?;

        for item in self
            .storage
            .cart_items
            .filter(&CartItemFilter::owned_by(profile.id))
            .await?
        {
            self.storage.cart_items.delete(item.id).await?;
        }

        for project in self
            .storage
            .book_projects
            .filter(&BookProjectFilter::owned_by(profile.id))
            .await?
        {
            self.storage.book_projects.delete(project.id).await?;
            self.media.remove(&project.data.pdf_file).await;
            if let Some(cover) = &project.data.cover_file {
                self.media.remove(cover).await;
            }
        }

        if !self.repo().delete(profile.id).await? {
            return Err(ServiceError::NotFound("profile"));
        }

        tracing::info!(profile_id = %profile.id, "Profile deleted");
        Ok(())
    }

    /// The caller's profile: by email, then by username (lowest id).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn me(&self, user: &CurrentUser) -> Result<Option<Profile>, ServiceError> {
        if let Some(profile) = self.first(ProfileFilter::by_email(user.email.as_str())).await? {
            return Ok(Some(profile));
        }
        if user.username.is_empty() {
            return Ok(None);
        }
        self.first(ProfileFilter::by_username(&user.username)).await
    }

    /// Create or partially update the profile identified by the payload's
    /// email (falling back to its username).
    ///
    /// A new profile may carry a password; an existing one follows the same
    /// rule as [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` when the email is missing or a
    /// field is invalid, and `ServiceError::Unauthenticated` or
    /// `ServiceError::Forbidden` for a refused password change.
    pub async fn save_settings(
        &self,
        payload: ProfilePayload,
        caller: Option<&CurrentUser>,
    ) -> Result<SavedSettings, ServiceError> {
        let username = match &payload.username {
            Field::Value(username) => username.trim().to_owned(),
            _ => String::new(),
        };

        let changes = payload.into_changes()?;
        let Some(email) = changes.patch.email.clone() else {
            return Err(ValidationErrors::single("email", REQUIRED).into());
        };

        let mut existing = self.first(ProfileFilter::by_email(email.as_str())).await?;
        if existing.is_none() && !username.is_empty() {
            existing = self.first(ProfileFilter::by_username(&username)).await?;
        }

        match existing {
            Some(profile) => Ok(SavedSettings {
                profile: self.apply(profile, changes, caller).await?,
                created: false,
            }),
            None => Ok(SavedSettings {
                profile: self.create_from(changes).await?,
                created: true,
            }),
        }
    }

    async fn first(&self, filter: ProfileFilter) -> Result<Option<Profile>, ServiceError> {
        Ok(self.repo().filter(&filter).await?.into_iter().next())
    }
}

fn check_password_change(caller: Option<&CurrentUser>, profile: &Profile) -> Result<(), ServiceError> {
    match caller {
        Some(user) if user.id == profile.id || user.is_staff => Ok(()),
        Some(user) => {
            tracing::warn!(user_id = %user.id, profile_id = %profile.id, "Password change refused");
            Err(ServiceError::Forbidden)
        }
        None => {
            tracing::warn!(profile_id = %profile.id, "Anonymous password change refused");
            Err(ServiceError::Unauthenticated)
        }
    }
}

fn duplicate_email(e: RepositoryError) -> ServiceError {
    match e {
        RepositoryError::Conflict(_) => ValidationErrors::single("email", DUPLICATE_EMAIL).into(),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::auth::{identity, verify_password};

    fn payload(json: serde_json::Value) -> ProfilePayload {
        serde_json::from_value(json).unwrap()
    }

    fn service_parts() -> (Storage, MediaStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (Storage::in_memory(), MediaStore::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn test_create_derives_username_and_unusable_password() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);

        let profile = service
            .create(payload(serde_json::json!({"email": "a@b.com"})))
            .await
            .unwrap();
        assert_eq!(profile.username, "a");
        assert!(!profile.has_usable_password());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_validation_error() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);

        service
            .create(payload(serde_json::json!({"email": "a@b.com"})))
            .await
            .unwrap();
        let err = service
            .create(payload(serde_json::json!({"email": "a@b.com"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.has("email")));
    }

    #[tokio::test]
    async fn test_update_with_password_makes_it_usable() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);

        let profile = service
            .create(payload(serde_json::json!({"email": "a@b.com"})))
            .await
            .unwrap();
        let staff = CurrentUser {
            id: ProfileId::new(999),
            email: fastprint_core::Email::parse("staff@b.com").unwrap(),
            username: "staff".to_owned(),
            is_staff: true,
        };
        let updated = service
            .update(
                profile.id,
                payload(serde_json::json!({"password": "hunter22"})),
                true,
                Some(&staff),
            )
            .await
            .unwrap();
        assert!(updated.has_usable_password());
    }

    #[tokio::test]
    async fn test_password_change_needs_owner_or_staff() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);

        let victim = service
            .create(payload(
                serde_json::json!({"email": "v@b.com", "password": "original1"}),
            ))
            .await
            .unwrap();
        let other = service
            .create(payload(serde_json::json!({"email": "o@b.com"})))
            .await
            .unwrap();
        let change = || payload(serde_json::json!({"password": "taken-over"}));

        let err = service
            .update(victim.id, change(), true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated));

        let err = service
            .update(victim.id, change(), true, Some(&identity(&other)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden));

        let stored = service.get(victim.id).await.unwrap();
        assert!(verify_password("original1", stored.password_hash.as_deref().unwrap()).is_ok());

        let own = service
            .update(victim.id, change(), true, Some(&identity(&victim)))
            .await
            .unwrap();
        assert!(verify_password("taken-over", own.password_hash.as_deref().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_anonymous_update_without_password_is_allowed() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);

        let profile = service
            .create(payload(serde_json::json!({"email": "a@b.com"})))
            .await
            .unwrap();
        let updated = service
            .update(profile.id, payload(serde_json::json!({"city": "Leeds"})), true, None)
            .await
            .unwrap();
        assert_eq!(updated.city.as_deref(), Some("Leeds"));
    }

    #[tokio::test]
    async fn test_save_settings_refuses_anonymous_password_on_existing_profile() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);

        let created = service
            .save_settings(
                payload(serde_json::json!({"email": "a@b.com", "password": "original1"})),
                None,
            )
            .await
            .unwrap();
        assert!(created.created);
        assert!(created.profile.has_usable_password());

        let err = service
            .save_settings(
                payload(serde_json::json!({"email": "a@b.com", "password": "taken-over"})),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated));

        let stored = service.get(created.profile.id).await.unwrap();
        assert!(verify_password("original1", stored.password_hash.as_deref().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_full_update_requires_email() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);

        let profile = service
            .create(payload(serde_json::json!({"email": "a@b.com"})))
            .await
            .unwrap();
        let err = service
            .update(profile.id, payload(serde_json::json!({"city": "Leeds"})), false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.has("email")));
    }

    #[tokio::test]
    async fn test_search_exact_email_wins() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);

        for email in ["ann@example.com", "joann@example.com", "ann@example.com.au"] {
            service
                .create(payload(serde_json::json!({"email": email})))
                .await
                .unwrap();
        }

        let filter = ProfileFilter {
            search: Some("ann@example.com".to_owned()),
            ..ProfileFilter::default()
        };
        let found = service.list(filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email.as_str(), "ann@example.com");

        let filter = ProfileFilter {
            search: Some("ANN@".to_owned()),
            ..ProfileFilter::default()
        };
        assert_eq!(service.list(filter).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_save_settings_is_idempotent_by_email() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);

        let first = service
            .save_settings(
                payload(serde_json::json!({"email": " a@b.com ", "first_name": "Ann"})),
                None,
            )
            .await
            .unwrap();
        assert!(first.created);

        let second = service
            .save_settings(
                payload(serde_json::json!({"email": "a@b.com", "first_name": "Anna"})),
                None,
            )
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.profile.id, first.profile.id);

        let all = service.list(ProfileFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].first_name.as_deref(), Some("Anna"));
    }

    #[tokio::test]
    async fn test_me_falls_back_to_username() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);

        let profile = service
            .create(payload(
                serde_json::json!({"email": "new@b.com", "username": "reader"}),
            ))
            .await
            .unwrap();

        let user = CurrentUser {
            id: profile.id,
            email: fastprint_core::Email::parse("old@b.com").unwrap(),
            username: "reader".to_owned(),
            is_staff: false,
        };
        let found = service.me(&user).await.unwrap().unwrap();
        assert_eq!(found.id, profile.id);

        let stranger = CurrentUser {
            username: "nobody".to_owned(),
            ..user
        };
        assert!(service.me(&stranger).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_profile_is_not_found() {
        let (storage, media, _dir) = service_parts();
        let service = ProfileService::new(&storage, &media);
        assert!(matches!(
            service.delete(ProfileId::new(42)).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
