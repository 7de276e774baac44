//! Cart handlers.
//!
//! Every endpoint requires a login and only ever sees the caller's items.
//! Bodies use the status envelope.

use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use fastprint_core::{CartItemId, ProfileId};

use super::envelope::Envelope;
use super::extract::{EnvelopeJson, EnvelopePath};
use crate::error::{EnvelopeContext, EnvelopeError};
use crate::middleware::RequireAuth;
use crate::models::cart::{CartItemPayload, CartItemView};
use crate::services::cart::CartService;
use crate::state::AppState;

type EnvelopeResult<T> = Result<T, EnvelopeError>;

const FETCH_FAILED: &str = "Failed to fetch cart items";
const CREATE_FAILED: &str = "Failed to create cart item";
const UPDATE_FAILED: &str = "Failed to update cart item";
const DELETE_FAILED: &str = "Failed to delete cart item";

/// List the caller's cart.
///
/// GET /api/cart/items/
///
/// # Errors
///
/// Returns `500` with a generic message if storage fails.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> EnvelopeResult<Envelope<Vec<CartItemView>>> {
    let cart = CartService::new(state.storage(), user.id);
    let items = cart.list().await.or_envelope(FETCH_FAILED)?;
    let views = cart.view(items).await.or_envelope(FETCH_FAILED)?;
    Ok(Envelope::list(views))
}

/// Add an item. Any `user` in the body is ignored.
///
/// POST /api/cart/items/
///
/// # Errors
///
/// Returns `400` with field errors.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    EnvelopeJson(payload): EnvelopeJson<CartItemPayload>,
) -> EnvelopeResult<(StatusCode, Envelope<CartItemView>)> {
    let cart = CartService::new(state.storage(), user.id);
    let item = cart.create(payload).await.or_envelope(CREATE_FAILED)?;
    let view = cart.view_one(item).await.or_envelope(CREATE_FAILED)?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(view).with_message("Cart item added successfully"),
    ))
}

/// Remove every item from the caller's cart.
///
/// DELETE /api/cart/items/
///
/// # Errors
///
/// Returns `500` with a generic message if storage fails.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> EnvelopeResult<Envelope<serde_json::Value>> {
    let removed = CartService::new(state.storage(), user.id)
        .clear()
        .await
        .or_envelope(DELETE_FAILED)?;
    Ok(Envelope::data(serde_json::json!({ "removed": removed }))
        .with_message("Cart cleared successfully"))
}

/// Get one item.
///
/// GET /api/cart/items/{id}/
///
/// # Errors
///
/// Returns `404` when the item is missing or not the caller's.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    EnvelopePath(id): EnvelopePath<i64>,
) -> EnvelopeResult<Envelope<CartItemView>> {
    let cart = CartService::new(state.storage(), user.id);
    let item = cart
        .get(CartItemId::new(id))
        .await
        .or_envelope(FETCH_FAILED)?;
    let view = cart.view_one(item).await.or_envelope(FETCH_FAILED)?;
    Ok(Envelope::data(view))
}

/// Replace an item. Every required field must be present.
///
/// PUT /api/cart/items/{id}/
///
/// # Errors
///
/// Returns `404` or `400` with field errors.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn replace(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    EnvelopePath(id): EnvelopePath<i64>,
    EnvelopeJson(payload): EnvelopeJson<CartItemPayload>,
) -> EnvelopeResult<Envelope<CartItemView>> {
    save(&state, user.id, id, payload, false).await
}

/// Update the supplied fields of an item.
///
/// PATCH /api/cart/items/{id}/
///
/// # Errors
///
/// Returns `404` or `400` with field errors.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    EnvelopePath(id): EnvelopePath<i64>,
    EnvelopeJson(payload): EnvelopeJson<CartItemPayload>,
) -> EnvelopeResult<Envelope<CartItemView>> {
    save(&state, user.id, id, payload, true).await
}

/// Delete an item.
///
/// DELETE /api/cart/items/{id}/
///
/// # Errors
///
/// Returns `404` when the item is missing or not the caller's.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    EnvelopePath(id): EnvelopePath<i64>,
) -> EnvelopeResult<Envelope<()>> {
    CartService::new(state.storage(), user.id)
        .delete(CartItemId::new(id))
        .await
        .or_envelope(DELETE_FAILED)?;
    Ok(Envelope::message("Cart item deleted successfully"))
}

async fn save(
    state: &AppState,
    owner: ProfileId,
    id: i64,
    payload: CartItemPayload,
    partial: bool,
) -> EnvelopeResult<Envelope<CartItemView>> {
    let cart = CartService::new(state.storage(), owner);
    let item = cart
        .update(CartItemId::new(id), payload, partial)
        .await
        .or_envelope(UPDATE_FAILED)?;
    let view = cart.view_one(item).await.or_envelope(UPDATE_FAILED)?;
    Ok(Envelope::data(view).with_message("Cart item updated successfully"))
}
