//! In-memory repository.
//!
//! One `RwLock`-guarded map per table. Each call holds the lock for its
//! whole duration, which gives the same per-statement atomicity as the
//! database backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Entity, Repository, RepositoryError};

/// Process-local [`Repository`] for any [`Entity`].
pub struct MemoryRepository<E: Entity> {
    rows: RwLock<BTreeMap<E::Id, E>>,
    next_id: AtomicI64,
}

impl<E: Entity> MemoryRepository<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn check_unique(
        rows: &BTreeMap<E::Id, E>,
        entity: &E,
    ) -> Result<(), RepositoryError> {
        let Some(key) = entity.unique_key() else {
            return Ok(());
        };

        let taken = rows
            .values()
            .any(|other| other.id() != entity.id() && other.unique_key().as_ref() == Some(&key));

        if taken {
            return Err(RepositoryError::Conflict(format!(
                "{} with this key already exists",
                E::NAME
            )));
        }
        Ok(())
    }
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn find(&self, id: E::Id) -> Result<Option<E>, RepositoryError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn filter(&self, filter: &E::Filter) -> Result<Vec<E>, RepositoryError> {
        let rows = self.rows.read().await;
        let mut matched: Vec<E> = rows
            .values()
            .filter(|row| row.matches(filter))
            .cloned()
            .collect();
        matched.sort_by(E::listing_order);
        Ok(matched)
    }

    async fn insert(&self, new: E::New) -> Result<E, RepositoryError> {
        let mut rows = self.rows.write().await;

        let id = E::Id::from(self.next_id.fetch_add(1, Ordering::SeqCst));
        let entity = E::from_new(id, new, Utc::now());
        Self::check_unique(&rows, &entity)?;

        rows.insert(id, entity.clone());
        Ok(entity)
    }

    async fn save(&self, entity: &E) -> Result<E, RepositoryError> {
        let mut rows = self.rows.write().await;

        if !rows.contains_key(&entity.id()) {
            return Err(RepositoryError::NotFound);
        }
        Self::check_unique(&rows, entity)?;

        let mut stored = entity.clone();
        stored.touch(Utc::now());
        rows.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: E::Id) -> Result<bool, RepositoryError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fastprint_core::{Email, ProfileId};

    use super::*;
    use crate::models::profile::{NewProfile, Profile, ProfileFilter};

    fn new_profile(email: &str) -> NewProfile {
        let email = Email::parse(email).unwrap();
        NewProfile {
            username: email.local_part().to_owned(),
            email,
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
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let repo = MemoryRepository::<Profile>::new();
        let a = repo.insert(new_profile("a@example.com")).await.unwrap();
        let b = repo.insert(new_profile("b@example.com")).await.unwrap();
        assert_eq!(a.id, ProfileId::new(1));
        assert_eq!(b.id, ProfileId::new(2));
    }

    #[tokio::test]
    async fn test_unique_key_enforced_on_insert_and_save() {
        let repo = MemoryRepository::<Profile>::new();
        repo.insert(new_profile("a@example.com")).await.unwrap();
        let mut b = repo.insert(new_profile("b@example.com")).await.unwrap();

        let dup = repo.insert(new_profile("a@example.com")).await;
        assert!(matches!(dup, Err(RepositoryError::Conflict(_))));

        b.email = Email::parse("a@example.com").unwrap();
        assert!(matches!(
            repo.save(&b).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_save_missing_row_is_not_found() {
        let repo = MemoryRepository::<Profile>::new();
        let a = repo.insert(new_profile("a@example.com")).await.unwrap();
        assert!(repo.delete(a.id).await.unwrap());
        assert!(!repo.delete(a.id).await.unwrap());
        assert!(matches!(repo.save(&a).await, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_filter_uses_entity_matching() {
        let repo = MemoryRepository::<Profile>::new();
        repo.insert(new_profile("a@example.com")).await.unwrap();
        repo.insert(new_profile("b@example.com")).await.unwrap();

        let found = repo
            .filter(&ProfileFilter::by_email("b@example.com"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email.as_str(), "b@example.com");
    }
}
