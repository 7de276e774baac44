//! Profile repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use fastprint_core::{AccountType, Email, ProfileId};

use super::{Entity, Repository, RepositoryError};
use crate::models::profile::{NewProfile, Profile, ProfileFilter};

impl Entity for Profile {
    type Id = ProfileId;
    type New = NewProfile;
    type Filter = ProfileFilter;

    const NAME: &'static str = "user profile";

    fn id(&self) -> ProfileId {
        self.id
    }

    fn from_new(id: ProfileId, new: NewProfile, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: new.email,
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            password_hash: new.password_hash,
            country: new.country,
            state: new.state,
            city: new.city,
            postal_code: new.postal_code,
            address: new.address,
            phone_number: new.phone_number,
            account_type: new.account_type,
            is_staff: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn matches(&self, filter: &ProfileFilter) -> bool {
        filter.matches(self)
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.as_str().to_owned())
    }
}

/// Database row for `user_profiles`.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    email: String,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    password_hash: Option<String>,
    country: Option<String>,
    state: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    address: Option<String>,
    phone_number: Option<String>,
    account_type: Option<String>,
    is_staff: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let account_type = row
            .account_type
            .map(|value| value.parse::<AccountType>())
            .transpose()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: ProfileId::new(row.id),
            email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            country: row.country,
            state: row.state,
            city: row.city,
            postal_code: row.postal_code,
            address: row.address,
            phone_number: row.phone_number,
            account_type,
            is_staff: row.is_staff,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `PostgreSQL` repository for profiles.
#[derive(Debug, Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Set or clear the staff flag by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no profile has this email.
    pub async fn set_staff(&self, email: &Email, is_staff: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE user_profiles
            SET is_staff = $2, updated_at = NOW()
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .bind(is_staff)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<Profile> for PgProfileRepository {
    async fn find(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT id, email, username, first_name, last_name, password_hash,
                   country, state, city, postal_code, address, phone_number,
                   account_type, is_staff, created_at, updated_at
            FROM user_profiles
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn filter(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT id, email, username, first_name, last_name, password_hash,
                   country, state, city, postal_code, address, phone_number,
                   account_type, is_staff, created_at, updated_at
            FROM user_profiles
            WHERE
                ($1::bigint IS NULL OR id = $1)
                AND ($2::text IS NULL OR email = $2)
                AND ($3::text IS NULL OR username = $3)
                AND (
                    $4::text IS NULL
                    OR email ILIKE '%' || $4 || '%'
                    OR username ILIKE '%' || $4 || '%'
                    OR first_name ILIKE '%' || $4 || '%'
                    OR last_name ILIKE '%' || $4 || '%'
                )
            ORDER BY id
            ",
        )
        .bind(filter.id.map(|id| id.as_i64()))
        .bind(filter.email.as_deref())
        .bind(filter.username.as_deref())
        .bind(filter.search.as_deref().map(escape_like))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Profile::try_from).collect()
    }

    async fn insert(&self, new: NewProfile) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            INSERT INTO user_profiles (
                email, username, first_name, last_name, password_hash,
                country, state, city, postal_code, address, phone_number, account_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, email, username, first_name, last_name, password_hash,
                      country, state, city, postal_code, address, phone_number,
                      account_type, is_staff, created_at, updated_at
            ",
        )
        .bind(new.email.as_str())
        .bind(&new.username)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.password_hash)
        .bind(&new.country)
        .bind(&new.state)
        .bind(&new.city)
        .bind(&new.postal_code)
        .bind(&new.address)
        .bind(&new.phone_number)
        .bind(new.account_type.map(AccountType::as_str))
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Profile::try_from(row)
    }

    async fn save(&self, profile: &Profile) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            UPDATE user_profiles
            SET email = $2, username = $3, first_name = $4, last_name = $5,
                password_hash = $6, country = $7, state = $8, city = $9,
                postal_code = $10, address = $11, phone_number = $12,
                account_type = $13, is_staff = $14, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, username, first_name, last_name, password_hash,
                      country, state, city, postal_code, address, phone_number,
                      account_type, is_staff, created_at, updated_at
            ",
        )
        .bind(profile.id.as_i64())
        .bind(profile.email.as_str())
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.password_hash)
        .bind(&profile.country)
        .bind(&profile.state)
        .bind(&profile.city)
        .bind(&profile.postal_code)
        .bind(&profile.address)
        .bind(&profile.phone_number)
        .bind(profile.account_type.map(AccountType::as_str))
        .bind(profile.is_staff)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?
        .ok_or(RepositoryError::NotFound)?;

        Profile::try_from(row)
    }

    async fn delete(&self, id: ProfileId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM user_profiles
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
