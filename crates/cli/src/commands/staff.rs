//! Staff flag management.
//!
//! Staff profiles can list every paid order and move orders through the
//! shipment workflow. The flag is never writable through the HTTP API.

use fastprint_core::Email;
use fastprint_server::db::{PgProfileRepository, RepositoryError};

use super::{CommandError, connect};

/// Set or clear the staff flag on the profile with `email`.
///
/// # Errors
///
/// Returns an error if the email is malformed, no profile has it, or the
/// database fails.
pub async fn set(email: &str, is_staff: bool) -> Result<(), CommandError> {
    let email = Email::parse(email.trim())?;
    let pool = connect().await?;

    match PgProfileRepository::new(pool)
        .set_staff(&email, is_staff)
        .await
    {
        Ok(()) => {
            tracing::info!(email = %email, is_staff, "Staff flag updated");
            Ok(())
        }
        Err(RepositoryError::NotFound) => Err(CommandError::UnknownProfile(email.into_inner())),
        Err(e) => Err(e.into()),
    }
}
