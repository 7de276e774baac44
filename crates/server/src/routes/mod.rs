//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                   - Liveness
//! GET  /health/ready                             - Readiness (database ping)
//!
//! # Auth
//! POST /api/auth/login                           - Session login
//! POST /api/auth/logout                          - Session logout
//!
//! # Profiles
//! GET  /api/userprofiles/                        - List / search
//! POST /api/userprofiles/                        - Create
//! GET  /api/userprofiles/me/                     - Caller's profile (auth)
//! POST /api/userprofiles/save-settings/          - Upsert by email
//! GET  /api/userprofiles/{id}/                   - Retrieve
//! PUT  /api/userprofiles/{id}/                   - Replace
//! PATCH /api/userprofiles/{id}/                  - Partial update
//! DELETE /api/userprofiles/{id}/                 - Delete
//! DELETE /api/userprofiles/{id}/delete-account/  - Delete (settings shape)
//!
//! # Cart (auth)
//! GET|POST|DELETE /api/cart/items/               - List / add / clear
//! GET|PUT|PATCH|DELETE /api/cart/items/{id}/     - One item
//!
//! # Books (auth)
//! POST /api/book/upload-book/                    - Upload (multipart)
//! POST /api/book/save-order/                     - Checkout (multipart)
//! GET  /api/book/book-projects/                  - Caller's projects
//! GET  /api/book/user-unpaid-projects/           - Unpaid projects
//! GET  /api/book/user-paid-orders/               - Orders
//! GET  /api/book/books/{id}/                     - One project
//! PUT|PATCH /api/book/books/{id}/update/         - Update (multipart)
//! DELETE /api/book/{id}/delete/                  - Delete
//! PATCH /api/book/orders/{id}/status/            - Change order status
//!
//! # Books (staff)
//! GET  /api/book/all-orders/
//! GET  /api/book/admin/orders/{id}/
//! POST /api/book/admin/orders/{id}/prepare-shipment/
//! GET  /api/book/admin/shipment-orders/
//! ```

pub mod auth;
pub mod books;
pub mod cart;
pub mod envelope;
pub mod extract;
pub mod health;
pub mod profiles;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/api/userprofiles/", get(profiles::list).post(profiles::create))
        .route("/api/userprofiles/me/", get(profiles::me))
        .route("/api/userprofiles/save-settings/", post(profiles::save_settings))
        .route(
            "/api/userprofiles/{id}/",
            get(profiles::show)
                .put(profiles::replace)
                .patch(profiles::update)
                .delete(profiles::destroy),
        )
        .route("/api/userprofiles/{id}/delete-account/", delete(profiles::delete_account))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/cart/items/",
            get(cart::list).post(cart::create).delete(cart::clear),
        )
        .route(
            "/api/cart/items/{id}/",
            get(cart::show)
                .put(cart::replace)
                .patch(cart::update)
                .delete(cart::destroy),
        )
}

/// Create the book and order routes router.
pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/api/book/upload-book/", post(books::upload))
        .route("/api/book/save-order/", post(books::save_order))
        .route("/api/book/book-projects/", get(books::list))
        .route("/api/book/user-unpaid-projects/", get(books::unpaid))
        .route("/api/book/user-paid-orders/", get(books::paid))
        .route("/api/book/books/{id}/", get(books::show))
        .route(
            "/api/book/books/{id}/update/",
            patch(books::update).put(books::replace),
        )
        .route("/api/book/{id}/delete/", delete(books::destroy))
        .route("/api/book/orders/{id}/status/", patch(books::update_status))
        // Staff
        .route("/api/book/all-orders/", get(books::all_orders))
        .route("/api/book/admin/orders/{id}/", get(books::admin_order))
        .route(
            "/api/book/admin/orders/{id}/prepare-shipment/",
            post(books::prepare_shipment),
        )
        .route("/api/book/admin/shipment-orders/", get(books::shipment_orders))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(auth_routes())
        .merge(profile_routes())
        .merge(cart_routes())
        .merge(book_routes())
}
