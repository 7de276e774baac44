//! Storage for Fastprint.
//!
//! # Tables
//!
//! - `user_profiles` - Account records (unique email)
//! - `cart_items` - Staged checkout entries, cascade-deleted with their owner
//! - `book_projects` - Uploads and orders, cascade-deleted with their owner
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! Services talk to storage only through [`Repository`], so the same code
//! runs against `PostgreSQL` in production and [`memory::MemoryRepository`]
//! in tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p fastprint-cli -- migrate
//! ```

pub mod book_projects;
pub mod cart_items;
pub mod memory;
pub mod profiles;

use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::models::book::BookProject;
use crate::models::cart::CartItem;
use crate::models::profile::Profile;

pub use book_projects::PgBookProjectRepository;
pub use cart_items::PgCartItemRepository;
pub use memory::MemoryRepository;
pub use profiles::PgProfileRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, missing owner).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map constraint violations to `Conflict`, everything else to `Database`.
    pub(crate) fn from_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(
                    db_err
                        .constraint()
                        .map_or_else(|| "unique violation".to_owned(), str::to_owned),
                );
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict("referenced row does not exist".to_owned());
            }
        }
        Self::Database(e)
    }
}

/// A stored record type.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Primary key.
    type Id: Copy + Ord + Display + From<i64> + Send + Sync + 'static;
    /// Creation input.
    type New: Send + Sync + 'static;
    /// Listing filter.
    type Filter: Default + Send + Sync + 'static;

    /// Name used in logs and error messages.
    const NAME: &'static str;

    fn id(&self) -> Self::Id;

    /// Build a record from creation input.
    fn from_new(id: Self::Id, new: Self::New, now: DateTime<Utc>) -> Self;

    /// Stamp the last-modified time.
    fn touch(&mut self, now: DateTime<Utc>);

    fn matches(&self, filter: &Self::Filter) -> bool;

    /// Listing order. Oldest id first unless overridden.
    fn listing_order(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }

    /// Value that must be unique across the table, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// Storage operations for one entity type.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Get a record by ID.
    async fn find(&self, id: E::Id) -> Result<Option<E>, RepositoryError>;

    /// List records matching `filter`, in the entity's listing order.
    async fn filter(&self, filter: &E::Filter) -> Result<Vec<E>, RepositoryError>;

    /// Insert a new record.
    ///
    /// Returns `RepositoryError::Conflict` on a uniqueness or owner violation.
    async fn insert(&self, new: E::New) -> Result<E, RepositoryError>;

    /// Persist every field of an existing record and return the stored copy.
    ///
    /// Returns `RepositoryError::NotFound` if the record no longer exists.
    async fn save(&self, entity: &E) -> Result<E, RepositoryError>;

    /// Delete a record. Returns `false` if it did not exist.
    async fn delete(&self, id: E::Id) -> Result<bool, RepositoryError>;
}

/// Shared handle to every repository the services use.
#[derive(Clone)]
pub struct Storage {
    pub profiles: Arc<dyn Repository<Profile>>,
    pub cart_items: Arc<dyn Repository<CartItem>>,
    pub book_projects: Arc<dyn Repository<BookProject>>,
    pool: Option<PgPool>,
}

impl Storage {
    /// `PostgreSQL`-backed storage.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            profiles: Arc::new(PgProfileRepository::new(pool.clone())),
            cart_items: Arc::new(PgCartItemRepository::new(pool.clone())),
            book_projects: Arc::new(PgBookProjectRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Process-local storage for tests and local demos.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            profiles: Arc::new(MemoryRepository::<Profile>::new()),
            cart_items: Arc::new(MemoryRepository::<CartItem>::new()),
            book_projects: Arc::new(MemoryRepository::<BookProject>::new()),
            pool: None,
        }
    }

    /// The connection pool, when backed by `PostgreSQL`.
    #[must_use]
    pub const fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Check the backing store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the database does not answer.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
