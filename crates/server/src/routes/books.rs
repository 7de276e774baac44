//! Book project, order and shipment handlers.
//!
//! Customer endpoints are owner-scoped; the `admin/` and `all-orders/`
//! endpoints require staff. Bodies use the status envelope.

use axum::{body::Bytes, extract::State, http::StatusCode};
use tracing::instrument;

use fastprint_core::{BookProjectId, ProfileId};

use super::envelope::Envelope;
use super::extract::{BookMultipart, EnvelopeJson, EnvelopePath};
use crate::error::{AppError, EnvelopeContext, EnvelopeError, add_breadcrumb};
use crate::middleware::{RequireAuth, RequireStaff};
use crate::models::book::{
    BookForm, BookProject, BookProjectView, OrderStatusPayload, PrepareShipmentPayload,
};
use crate::services::books::BookService;
use crate::state::AppState;

type EnvelopeResult<T> = Result<T, EnvelopeError>;

fn service(state: &AppState) -> BookService<'_> {
    BookService::new(state.storage(), state.media())
}

async fn list_view(
    books: &BookService<'_>,
    projects: Vec<BookProject>,
    failure: &'static str,
) -> EnvelopeResult<Envelope<Vec<BookProjectView>>> {
    let views = books.views(projects).await.or_envelope(failure)?;
    Ok(Envelope::list(views))
}

// =============================================================================
// Projects
// =============================================================================

/// Upload a new book project.
///
/// POST /api/book/upload-book/ (multipart)
///
/// # Errors
///
/// Returns `400` with field errors when the title or PDF is missing.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn upload(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    BookMultipart(form): BookMultipart,
) -> EnvelopeResult<(StatusCode, Envelope<BookProjectView>)> {
    const FAILED: &str = "Failed to upload book project";

    let books = service(&state);
    let project = books.upload(user.id, form).await.or_envelope(FAILED)?;
    let view = books.view(project).await.or_envelope(FAILED)?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(view).with_message("Book project uploaded successfully"),
    ))
}

/// The caller's projects.
///
/// GET /api/book/book-projects/
///
/// # Errors
///
/// Returns `500` with a generic message if storage fails.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> EnvelopeResult<Envelope<Vec<BookProjectView>>> {
    const FAILED: &str = "Failed to fetch book projects";

    let books = service(&state);
    let projects = books.list(user.id).await.or_envelope(FAILED)?;
    list_view(&books, projects, FAILED).await
}

/// The caller's unpaid projects.
///
/// GET /api/book/user-unpaid-projects/
///
/// # Errors
///
/// Returns `500` with a generic message if storage fails.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn unpaid(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> EnvelopeResult<Envelope<Vec<BookProjectView>>> {
    const FAILED: &str = "Failed to fetch unpaid projects";

    let books = service(&state);
    let projects = books.unpaid(user.id).await.or_envelope(FAILED)?;
    list_view(&books, projects, FAILED).await
}

/// The caller's orders.
///
/// GET /api/book/user-paid-orders/
///
/// # Errors
///
/// Returns `500` with a generic message if storage fails.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn paid(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> EnvelopeResult<Envelope<Vec<BookProjectView>>> {
    const FAILED: &str = "Failed to fetch orders";

    let books = service(&state);
    let projects = books.paid(user.id).await.or_envelope(FAILED)?;
    list_view(&books, projects, FAILED).await
}

/// One of the caller's projects.
///
/// GET /api/book/books/{id}/
///
/// # Errors
///
/// Returns `404` when missing or not the caller's.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    EnvelopePath(id): EnvelopePath<i64>,
) -> EnvelopeResult<Envelope<BookProjectView>> {
    const FAILED: &str = "Failed to fetch book project";

    let books = service(&state);
    let project = books
        .get(user.id, BookProjectId::new(id))
        .await
        .or_envelope(FAILED)?;
    Ok(Envelope::data(books.view(project).await.or_envelope(FAILED)?))
}

/// Replace an unpaid project's fields. `title` is required.
///
/// PUT /api/book/books/{id}/update/ (multipart)
///
/// # Errors
///
/// Returns `404`, `400` with field errors, or `409` for an order.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn replace(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    EnvelopePath(id): EnvelopePath<i64>,
    BookMultipart(form): BookMultipart,
) -> EnvelopeResult<Envelope<BookProjectView>> {
    save(&state, user.id, id, form, false).await
}

/// Update the supplied fields of an unpaid project.
///
/// PATCH /api/book/books/{id}/update/ (multipart)
///
/// # Errors
///
/// Returns `404`, `400` with field errors, or `409` for an order.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    EnvelopePath(id): EnvelopePath<i64>,
    BookMultipart(form): BookMultipart,
) -> EnvelopeResult<Envelope<BookProjectView>> {
    save(&state, user.id, id, form, true).await
}

async fn save(
    state: &AppState,
    owner: ProfileId,
    id: i64,
    form: BookForm,
    partial: bool,
) -> EnvelopeResult<Envelope<BookProjectView>> {
    const FAILED: &str = "Failed to update book project";

    let books = service(state);
    let project = books
        .update(owner, BookProjectId::new(id), form, partial)
        .await
        .or_envelope(FAILED)?;
    let view = books.view(project).await.or_envelope(FAILED)?;
    Ok(Envelope::data(view).with_message("Book project updated successfully"))
}

/// Delete an unpaid project.
///
/// DELETE /api/book/{id}/delete/
///
/// # Errors
///
/// Returns `404`, or `409` for an order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    EnvelopePath(id): EnvelopePath<i64>,
) -> EnvelopeResult<Envelope<()>> {
    service(&state)
        .delete(user.id, BookProjectId::new(id))
        .await
        .or_envelope("Failed to delete book project")?;
    Ok(Envelope::message("Book project deleted successfully"))
}

// =============================================================================
// Orders
// =============================================================================

/// Check out a project into a paid order.
///
/// POST /api/book/save-order/ (multipart)
///
/// # Errors
///
/// Returns `404` for an unknown project or cart item, `409` when the project
/// was already ordered, and `400` with field errors.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn save_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    BookMultipart(form): BookMultipart,
) -> EnvelopeResult<(StatusCode, Envelope<BookProjectView>)> {
    const FAILED: &str = "Failed to save order";

    let books = service(&state);
    let order = books.save_order(user.id, form).await.or_envelope(FAILED)?;
    add_breadcrumb("checkout", "Order saved", &[("book_project_id", order.id.to_string())]);

    let view = books.view(order).await.or_envelope(FAILED)?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(view).with_message("Order saved successfully"),
    ))
}

/// Change an order's status.
///
/// PATCH /api/book/orders/{id}/status/
///
/// # Errors
///
/// Returns `400` for an unknown status, `404` for someone else's order
/// (unless staff), and `409` for a move the workflow does not allow.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    EnvelopePath(id): EnvelopePath<i64>,
    EnvelopeJson(payload): EnvelopeJson<OrderStatusPayload>,
) -> EnvelopeResult<Envelope<BookProjectView>> {
    const FAILED: &str = "Failed to update order status";

    let status = payload.into_status().or_envelope(FAILED)?;
    let books = service(&state);
    let order = books
        .update_status(&user, BookProjectId::new(id), status)
        .await
        .or_envelope(FAILED)?;
    let view = books.view(order).await.or_envelope(FAILED)?;
    Ok(Envelope::data(view).with_message("Order status updated successfully"))
}

// =============================================================================
// Staff
// =============================================================================

/// Every order.
///
/// GET /api/book/all-orders/
///
/// # Errors
///
/// Returns `401`/`403` for non-staff.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn all_orders(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
) -> EnvelopeResult<Envelope<Vec<BookProjectView>>> {
    const FAILED: &str = "Failed to fetch orders";

    let books = service(&state);
    let orders = books.all_orders().await.or_envelope(FAILED)?;
    list_view(&books, orders, FAILED).await
}

/// One order, any owner.
///
/// GET /api/book/admin/orders/{id}/
///
/// # Errors
///
/// Returns `404` for an unknown or unpaid project.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn admin_order(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    EnvelopePath(id): EnvelopePath<i64>,
) -> EnvelopeResult<Envelope<BookProjectView>> {
    const FAILED: &str = "Failed to fetch order";

    let books = service(&state);
    let order = books
        .order(BookProjectId::new(id))
        .await
        .or_envelope(FAILED)?;
    Ok(Envelope::data(books.view(order).await.or_envelope(FAILED)?))
}

/// Mark a pending order as prepared for shipment.
///
/// POST /api/book/admin/orders/{id}/prepare-shipment/
///
/// The JSON body (`courier_name`, `tracking_number`, `estimated_delivery`)
/// is optional.
///
/// # Errors
///
/// Returns `404`, or `409` unless the order is pending.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn prepare_shipment(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    EnvelopePath(id): EnvelopePath<i64>,
    body: Bytes,
) -> EnvelopeResult<Envelope<BookProjectView>> {
    const FAILED: &str = "Failed to prepare shipment";

    let details = parse_shipment_details(&body).or_envelope(FAILED)?;
    let books = service(&state);
    let order = books
        .prepare_shipment(BookProjectId::new(id), details)
        .await
        .or_envelope(FAILED)?;
    let view = books.view(order).await.or_envelope(FAILED)?;
    Ok(Envelope::data(view).with_message("Order prepared for shipment"))
}

/// Orders prepared for shipment or shipped.
///
/// GET /api/book/admin/shipment-orders/
///
/// # Errors
///
/// Returns `401`/`403` for non-staff.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn shipment_orders(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
) -> EnvelopeResult<Envelope<Vec<BookProjectView>>> {
    const FAILED: &str = "Failed to fetch shipment orders";

    let books = service(&state);
    let orders = books.shipment_orders().await.or_envelope(FAILED)?;
    list_view(&books, orders, FAILED).await
}

/// An empty body means no details.
fn parse_shipment_details(body: &[u8]) -> Result<PrepareShipmentPayload, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PrepareShipmentPayload::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))
}
