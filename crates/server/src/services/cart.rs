//! Cart service.
//!
//! Every operation is scoped to the calling profile. An item owned by
//! someone else is indistinguishable from a missing one.

use fastprint_core::{CartItemId, ProfileId};

use super::ServiceError;
use crate::db::{Repository, Storage};
use crate::models::cart::{CartItem, CartItemFilter, CartItemPayload, CartItemView, NewCartItem};

/// Cart operations for one owner.
pub struct CartService<'a> {
    storage: &'a Storage,
    owner: ProfileId,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(storage: &'a Storage, owner: ProfileId) -> Self {
        Self { storage, owner }
    }

    fn repo(&self) -> &dyn Repository<CartItem> {
        self.storage.cart_items.as_ref()
    }

    /// The owner's items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<CartItem>, ServiceError> {
        Ok(self
            .repo()
            .filter(&CartItemFilter::owned_by(self.owner))
            .await?)
    }

    /// One of the owner's items.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if missing or owned by someone else.
    pub async fn get(&self, id: CartItemId) -> Result<CartItem, ServiceError> {
        self.repo()
            .find(id)
            .await?
            .filter(|item| item.owner == self.owner)
            .ok_or(ServiceError::NotFound("cart item"))
    }

    /// Add an item. The owner is always the caller.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for missing or invalid fields.
    pub async fn create(&self, payload: CartItemPayload) -> Result<CartItem, ServiceError> {
        let data = payload.into_patch()?.into_data()?;
        let item = self
            .repo()
            .insert(NewCartItem {
                owner: self.owner,
                data,
            })
            .await?;

        tracing::info!(cart_item_id = %item.id, owner = %self.owner, "Cart item added");
        Ok(item)
    }

    /// Update an item. A full update (`partial == false`) needs every
    /// required field.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` or `ServiceError::Validation`.
    pub async fn update(
        &self,
        id: CartItemId,
        payload: CartItemPayload,
        partial: bool,
    ) -> Result<CartItem, ServiceError> {
        let patch = payload.into_patch()?;
        if !partial {
            patch.require_complete()?;
        }

        let mut item = self.get(id).await?;
        patch.apply(&mut item.data);
        let saved = self.repo().save(&item).await?;

        tracing::info!(cart_item_id = %saved.id, partial, "Cart item updated");
        Ok(saved)
    }

    /// Remove one of the owner's items.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if missing or owned by someone else.
    pub async fn delete(&self, id: CartItemId) -> Result<(), ServiceError> {
        let item = self.get(id).await?;
        if !self.repo().delete(item.id).await? {
            return Err(ServiceError::NotFound("cart item"));
        }
        tracing::info!(cart_item_id = %item.id, "Cart item deleted");
        Ok(())
    }

    /// Remove all of the owner's items. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storage fails.
    pub async fn clear(&self) -> Result<usize, ServiceError> {
        let mut removed = 0;
        for item in self.list().await? {
            if self.repo().delete(item.id).await? {
                removed += 1;
            }
        }
        tracing::info!(owner = %self.owner, removed, "Cart cleared");
        Ok(removed)
    }

    async fn owner_email(&self) -> Result<Option<String>, ServiceError> {
        Ok(self
            .storage
            .profiles
            .find(self.owner)
            .await?
            .map(|profile| profile.email.into_inner()))
    }

    /// Attach the owner's email for serialization.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the owner lookup fails.
    pub async fn view(&self, items: Vec<CartItem>) -> Result<Vec<CartItemView>, ServiceError> {
        let user_email = self.owner_email().await?;
        Ok(items
            .into_iter()
            .map(|item| CartItemView {
                item,
                user_email: user_email.clone(),
            })
            .collect())
    }

    /// Like [`view`](Self::view) for a single item.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the owner lookup fails.
    pub async fn view_one(&self, item: CartItem) -> Result<CartItemView, ServiceError> {
        Ok(CartItemView {
            item,
            user_email: self.owner_email().await?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::cart::tests::sample_payload;

    fn payload(json: serde_json::Value) -> CartItemPayload {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_items_are_owner_scoped() {
        let storage = Storage::in_memory();
        let alice = CartService::new(&storage, ProfileId::new(1));
        let bob = CartService::new(&storage, ProfileId::new(2));

        let item = alice.create(payload(sample_payload())).await.unwrap();

        assert!(matches!(
            bob.get(item.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            bob.delete(item.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            bob.update(item.id, payload(serde_json::json!({"subtotal": "1"})), true)
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(bob.list().await.unwrap().is_empty());
        assert_eq!(alice.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_full_update_requires_all_fields() {
        let storage = Storage::in_memory();
        let cart = CartService::new(&storage, ProfileId::new(1));
        let item = cart.create(payload(sample_payload())).await.unwrap();

        let err = cart
            .update(item.id, payload(serde_json::json!({"subtotal": "1"})), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.has("preview_form")));

        let mut full = sample_payload();
        full["city"] = serde_json::json!("Manchester");
        let updated = cart.update(item.id, payload(full), false).await.unwrap();
        assert_eq!(updated.data.city, "Manchester");
    }

    #[tokio::test]
    async fn test_clear_only_touches_owner() {
        let storage = Storage::in_memory();
        let alice = CartService::new(&storage, ProfileId::new(1));
        let bob = CartService::new(&storage, ProfileId::new(2));

        alice.create(payload(sample_payload())).await.unwrap();
        alice.create(payload(sample_payload())).await.unwrap();
        bob.create(payload(sample_payload())).await.unwrap();

        assert_eq!(alice.clear().await.unwrap(), 2);
        assert_eq!(bob.list().await.unwrap().len(), 1);
    }
}
