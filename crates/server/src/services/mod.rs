//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password hashing and login
//! - `profiles` - Profile CRUD, lookup of the caller's profile, settings upsert
//! - `cart` - Owner-scoped cart items
//! - `books` - Book uploads, checkout into orders, order workflow and shipment
//!
//! Services borrow [`Storage`](crate::db::Storage) from the application
//! state and are built per request.

pub mod auth;
pub mod books;
pub mod cart;
pub mod profiles;

use thiserror::Error;

use fastprint_core::{TransitionError, ValidationErrors};

use crate::db::RepositoryError;
use crate::media::MediaError;

/// Errors returned by the domain services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Field-level validation failed.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// The record does not exist or is not visible to the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request conflicts with the record's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage failure.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Upload could not be stored.
    #[error("media error: {0}")]
    Media(#[from] MediaError),

    /// The operation needs a logged-in caller.
    #[error("authentication required")]
    Unauthenticated,

    /// The caller may not perform the operation on this record.
    #[error("permission denied")]
    Forbidden,

    /// Password hashing failed.
    #[error("password hashing error")]
    PasswordHash,
}

impl From<TransitionError> for ServiceError {
    fn from(e: TransitionError) -> Self {
        Self::Conflict(e.to_string())
    }
}
