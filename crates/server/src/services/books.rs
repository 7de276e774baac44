//! Book project and order service.
//!
//! Customers upload projects, edit them while unpaid, then check out. A
//! checked-out project is an order: customers may only cancel it, staff
//! walk it through shipment.

use std::collections::HashMap;

use chrono::Utc;

use fastprint_core::{
    BookProjectId, CartItemId, OrderStatus, PaymentStatus, ProfileId, TransitionActor,
    ValidationErrors,
};

use super::ServiceError;
use super::cart::CartService;
use crate::db::{Repository, RepositoryError, Storage};
use crate::media::{BOOK_COVERS, BOOK_PDFS, MediaStore};
use crate::models::book::{
    BookForm, BookProject, BookProjectData, BookProjectFilter, BookProjectPatch, BookProjectPayload,
    BookProjectView, INVALID_INTEGER, NewBookProject, PrepareShipmentPayload,
};
use crate::models::fields::{self, Field};
use crate::models::session::CurrentUser;

const NOT_EDITABLE: &str = "book project has been ordered and can no longer be changed";
const ALREADY_PAID: &str = "book project has already been ordered";
const PREPARE_VIA_ENDPOINT: &str =
    "orders are prepared for shipment through the prepare-shipment endpoint";

/// Validated text fields plus the ids a save-order form may reference.
struct OrderForm {
    patch: BookProjectPatch,
    book_project_id: Option<BookProjectId>,
    cart_item_id: Option<CartItemId>,
}

/// Files written for one request.
struct StoredUploads {
    /// New paths, removed again if the record cannot be written.
    added: Vec<String>,
    /// Paths the new files replace, removed once the record is written.
    replaced: Vec<String>,
}

/// Book project operations.
pub struct BookService<'a> {
    storage: &'a Storage,
    media: &'a MediaStore,
}

impl<'a> BookService<'a> {
    #[must_use]
    pub const fn new(storage: &'a Storage, media: &'a MediaStore) -> Self {
        Self { storage, media }
    }

    fn repo(&self) -> &dyn Repository<BookProject> {
        self.storage.book_projects.as_ref()
    }

    async fn list_by(&self, filter: BookProjectFilter) -> Result<Vec<BookProject>, ServiceError> {
        Ok(self.repo().filter(&filter).await?)
    }

    // =========================================================================
    // Customer operations
    // =========================================================================

    /// Upload a new project. It starts unpaid and `in_cart`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` when the title or interior PDF is
    /// missing or a field is invalid, `ServiceError::Media` if the files
    /// cannot be stored.
    pub async fn upload(&self, owner: ProfileId, form: BookForm) -> Result<BookProject, ServiceError> {
        let patch = parse_patch(&form)?;
        let data = self.new_data(patch, &form).await?;
        let added = files_of(&data);

        let inserted = self
            .repo()
            .insert(NewBookProject {
                owner,
                data,
                payment_status: PaymentStatus::Unpaid,
                status: OrderStatus::InCart,
            })
            .await;
        let project = self.discard_on_error(inserted, &added).await?;

        tracing::info!(book_project_id = %project.id, owner = %owner, "Book project uploaded");
        Ok(project)
    }

    /// All of the owner's projects, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(&self, owner: ProfileId) -> Result<Vec<BookProject>, ServiceError> {
        self.list_by(BookProjectFilter::owned_by(owner)).await
    }

    /// The owner's projects that have not been paid for.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn unpaid(&self, owner: ProfileId) -> Result<Vec<BookProject>, ServiceError> {
        self.list_by(BookProjectFilter::owned_by(owner).with_payment_status(PaymentStatus::Unpaid))
            .await
    }

    /// The owner's orders.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn paid(&self, owner: ProfileId) -> Result<Vec<BookProject>, ServiceError> {
        self.list_by(BookProjectFilter::owned_by(owner).with_payment_status(PaymentStatus::Paid))
            .await
    }

    /// One of the owner's projects.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if missing or owned by someone else.
    pub async fn get(&self, owner: ProfileId, id: BookProjectId) -> Result<BookProject, ServiceError> {
        self.repo()
            .find(id)
            .await?
            .filter(|project| project.owner == owner)
            .ok_or(ServiceError::NotFound("book project"))
    }

    /// Update an unpaid project. New files replace the stored ones.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound`, `ServiceError::Validation`, or
    /// `ServiceError::Conflict` once the project has been ordered.
    pub async fn update(
        &self,
        owner: ProfileId,
        id: BookProjectId,
        form: BookForm,
        partial: bool,
    ) -> Result<BookProject, ServiceError> {
        let mut patch = parse_patch(&form)?;
        if !partial {
            patch.require_complete()?;
        }

        let mut project = self.get(owner, id).await?;
        if !is_editable(&project) {
            return Err(ServiceError::Conflict(NOT_EDITABLE.to_owned()));
        }

        let uploads = self.store_uploads(&form, &mut patch, &project).await?;
        patch.apply(&mut project.data);
        let saved = self
            .discard_on_error(self.repo().save(&project).await, &uploads.added)
            .await?;
        self.remove_all(&uploads.replaced).await;

        tracing::info!(book_project_id = %saved.id, partial, "Book project updated");
        Ok(saved)
    }

    /// Delete an unpaid project and its files.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound`, or `ServiceError::Conflict` for an
    /// order.
    pub async fn delete(&self, owner: ProfileId, id: BookProjectId) -> Result<(), ServiceError> {
        let project = self.get(owner, id).await?;
        if project.is_order() {
            return Err(ServiceError::Conflict(NOT_EDITABLE.to_owned()));
        }

        if !self.repo().delete(project.id).await? {
            return Err(ServiceError::NotFound("book project"));
        }
        self.media.remove(&project.data.pdf_file).await;
        if let Some(cover) = &project.data.cover_file {
            self.media.remove(cover).await;
        }

        tracing::info!(book_project_id = %project.id, "Book project deleted");
        Ok(())
    }

    /// Check out: turn an unpaid project (existing or uploaded with this
    /// form) into a paid, pending order.
    ///
    /// Fields the form leaves out are filled from the referenced cart item,
    /// which is removed once the order is stored. Failing to remove it is
    /// logged and does not fail the checkout.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown project or cart item,
    /// `ServiceError::Conflict` when the project was already ordered, and
    /// `ServiceError::Validation` for invalid fields.
    pub async fn save_order(&self, owner: ProfileId, form: BookForm) -> Result<BookProject, ServiceError> {
        let OrderForm {
            mut patch,
            book_project_id,
            cart_item_id,
        } = parse_order_form(&form)?;

        let cart = CartService::new(self.storage, owner);
        let cart_item = match cart_item_id {
            Some(id) => Some(cart.get(id).await?),
            None => None,
        };

        let order = if let Some(id) = book_project_id {
            let mut project = self.get(owner, id).await?;
            if project.is_order() {
                return Err(ServiceError::Conflict(ALREADY_PAID.to_owned()));
            }
            let status = project.status.transition(OrderStatus::Pending, TransitionActor::Checkout)?;

            let uploads = self.store_uploads(&form, &mut patch, &project).await?;
            patch.apply(&mut project.data);
            if let Some(item) = &cart_item {
                project.data.fill_missing_from(&item.data);
            }
            project.payment_status = PaymentStatus::Paid;
            project.status = status;

            let saved = self
                .discard_on_error(self.repo().save(&project).await, &uploads.added)
                .await?;
            self.remove_all(&uploads.replaced).await;
            saved
        } else {
            let status = OrderStatus::InCart.transition(OrderStatus::Pending, TransitionActor::Checkout)?;
            let mut data = self.new_data(patch, &form).await?;
            if let Some(item) = &cart_item {
                data.fill_missing_from(&item.data);
            }
            let added = files_of(&data);
            let inserted = self
                .repo()
                .insert(NewBookProject {
                    owner,
                    data,
                    payment_status: PaymentStatus::Paid,
                    status,
                })
                .await;
            self.discard_on_error(inserted, &added).await?
        };

        if let Some(item) = cart_item
            && let Err(e) = self.storage.cart_items.delete(item.id).await
        {
            tracing::warn!(
                cart_item_id = %item.id,
                book_project_id = %order.id,
                error = %e,
                "Cart item left behind after checkout"
            );
        }

        tracing::info!(
            book_project_id = %order.id,
            owner = %owner,
            from_cart = cart_item_id.is_some(),
            "Order saved"
        );
        Ok(order)
    }

    /// Change an order's status.
    ///
    /// Staff may act on any order; customers only on their own, and only
    /// to cancel. Preparation for shipment goes through
    /// [`prepare_shipment`](Self::prepare_shipment).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for an unknown or foreign project and
    /// `ServiceError::Conflict` for a move the workflow does not allow.
    pub async fn update_status(
        &self,
        user: &CurrentUser,
        id: BookProjectId,
        to: OrderStatus,
    ) -> Result<BookProject, ServiceError> {
        let mut project = self
            .repo()
            .find(id)
            .await?
            .filter(|project| user.is_staff || project.owner == user.id)
            .ok_or(ServiceError::NotFound("book project"))?;

        if to == OrderStatus::PreparedForShipment {
            return Err(ServiceError::Conflict(PREPARE_VIA_ENDPOINT.to_owned()));
        }

        let actor = if user.is_staff {
            TransitionActor::Staff
        } else {
            TransitionActor::Owner
        };
        let from = project.status;
        project.status = from.transition(to, actor)?;
        if to == OrderStatus::Shipped {
            project.shipped_at = Some(Utc::now());
        }

        let saved = self.repo().save(&project).await?;
        tracing::info!(
            book_project_id = %saved.id,
            from = %from,
            to = %to,
            staff = user.is_staff,
            "Order status changed"
        );
        Ok(saved)
    }

    // =========================================================================
    // Staff operations
    // =========================================================================

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn all_orders(&self) -> Result<Vec<BookProject>, ServiceError> {
        self.list_by(BookProjectFilter::default().with_payment_status(PaymentStatus::Paid))
            .await
    }

    /// One order, regardless of owner.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if missing or not yet paid for.
    pub async fn order(&self, id: BookProjectId) -> Result<BookProject, ServiceError> {
        self.repo()
            .find(id)
            .await?
            .filter(BookProject::is_order)
            .ok_or(ServiceError::NotFound("order"))
    }

    /// Mark a pending order as prepared for shipment.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for over-long details,
    /// `ServiceError::NotFound`, or `ServiceError::Conflict` unless the
    /// order is pending.
    pub async fn prepare_shipment(
        &self,
        id: BookProjectId,
        details: PrepareShipmentPayload,
    ) -> Result<BookProject, ServiceError> {
        details.validate()?;

        let mut order = self.order(id).await?;
        order.status = order
            .status
            .transition(OrderStatus::PreparedForShipment, TransitionActor::Staff)?;

        if let Some(courier) = details.courier_name {
            order.data.quote.courier_name = Some(courier);
        }
        if let Some(tracking) = details.tracking_number {
            order.tracking_number = Some(tracking);
        }
        if let Some(estimate) = details.estimated_delivery {
            order.data.quote.estimated_delivery = Some(estimate);
        }
        order.shipment_prepared_at = Some(Utc::now());

        let saved = self.repo().save(&order).await?;
        tracing::info!(book_project_id = %saved.id, "Order prepared for shipment");
        Ok(saved)
    }

    /// Orders prepared for shipment or already shipped.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn shipment_orders(&self) -> Result<Vec<BookProject>, ServiceError> {
        self.list_by(
            BookProjectFilter::default()
                .with_statuses(&[OrderStatus::PreparedForShipment, OrderStatus::Shipped]),
        )
        .await
    }

    /// Attach owner emails for serialization.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if an owner lookup fails.
    pub async fn views(&self, projects: Vec<BookProject>) -> Result<Vec<BookProjectView>, ServiceError> {
        let mut emails: HashMap<ProfileId, Option<String>> = HashMap::new();
        let mut views = Vec::with_capacity(projects.len());

        for project in projects {
            let user_email = if let Some(email) = emails.get(&project.owner) {
                email.clone()
            } else {
                let email = self
                    .storage
                    .profiles
                    .find(project.owner)
                    .await?
                    .map(|profile| profile.email.into_inner());
                emails.insert(project.owner, email.clone());
                email
            };
            views.push(BookProjectView { project, user_email });
        }

        Ok(views)
    }

    /// Like [`views`](Self::views) for a single project.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the owner lookup fails.
    pub async fn view(&self, project: BookProject) -> Result<BookProjectView, ServiceError> {
        let user_email = self
            .storage
            .profiles
            .find(project.owner)
            .await?
            .map(|profile| profile.email.into_inner());
        Ok(BookProjectView { project, user_email })
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Creation data for a new project: checks the required fields, then
    /// stores the uploads.
    async fn new_data(
        &self,
        mut patch: BookProjectPatch,
        form: &BookForm,
    ) -> Result<BookProjectData, ServiceError> {
        let mut errors = ValidationErrors::new();
        fields::require(&mut errors, "title", patch.title.as_ref());
        fields::require(&mut errors, "pdf_file", form.pdf_file.as_ref());
        errors.into_result(())?;

        let mut stored = Vec::new();
        if let Some(pdf) = &form.pdf_file {
            let path = self.media.save(BOOK_PDFS, pdf).await?;
            stored.push(path.clone());
            patch.pdf_file = Some(path);
        }
        if let Some(cover) = &form.cover_file {
            match self.media.save(BOOK_COVERS, cover).await {
                Ok(path) => patch.cover_file = Some(Some(path)),
                Err(e) => {
                    self.remove_all(&stored).await;
                    return Err(e.into());
                }
            }
        }

        match patch.into_data() {
            Ok(data) => Ok(data),
            Err(errors) => {
                self.remove_all(&stored).await;
                Err(errors.into())
            }
        }
    }

    /// Store replacement files into `patch`.
    async fn store_uploads(
        &self,
        form: &BookForm,
        patch: &mut BookProjectPatch,
        current: &BookProject,
    ) -> Result<StoredUploads, ServiceError> {
        let mut uploads = StoredUploads {
            added: Vec::new(),
            replaced: Vec::new(),
        };
        if let Some(pdf) = &form.pdf_file {
            let path = self.media.save(BOOK_PDFS, pdf).await?;
            uploads.added.push(path.clone());
            uploads.replaced.push(current.data.pdf_file.clone());
            patch.pdf_file = Some(path);
        }
        if let Some(cover) = &form.cover_file {
            match self.media.save(BOOK_COVERS, cover).await {
                Ok(path) => {
                    uploads.added.push(path.clone());
                    uploads.replaced.extend(current.data.cover_file.clone());
                    patch.cover_file = Some(Some(path));
                }
                Err(e) => {
                    self.remove_all(&uploads.added).await;
                    return Err(e.into());
                }
            }
        }
        Ok(uploads)
    }

    /// Remove `stored` when the write that should reference it failed.
    async fn discard_on_error<T>(
        &self,
        written: Result<T, RepositoryError>,
        stored: &[String],
    ) -> Result<T, ServiceError> {
        if written.is_err() {
            self.remove_all(stored).await;
        }
        Ok(written?)
    }

    async fn remove_all(&self, paths: &[String]) {
        for path in paths {
            self.media.remove(path).await;
        }
    }
}

fn files_of(data: &BookProjectData) -> Vec<String> {
    let mut files = vec![data.pdf_file.clone()];
    files.extend(data.cover_file.clone());
    files
}

/// Unpaid projects still sitting in the cart are the only editable ones.
fn is_editable(project: &BookProject) -> bool {
    project.payment_status == PaymentStatus::Unpaid && project.status == OrderStatus::InCart
}

fn parse_patch(form: &BookForm) -> Result<BookProjectPatch, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let payload = BookProjectPayload::from_form(&form.fields, &mut errors);
    let patch = payload.into_patch(&mut errors);
    errors.into_result(patch)
}

fn parse_order_form(form: &BookForm) -> Result<OrderForm, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let id = |errors: &mut ValidationErrors, name: &str| {
        match fields::parse_form::<i64>(errors, name, form.fields.get(name), INVALID_INTEGER) {
            Field::Value(id) => Some(id),
            Field::Missing | Field::Null => None,
        }
    };

    let book_project_id = id(&mut errors, "book_project_id").map(BookProjectId::new);
    let cart_item_id = id(&mut errors, "cart_item_id").map(CartItemId::new);
    let payload = BookProjectPayload::from_form(&form.fields, &mut errors);
    let patch = payload.into_patch(&mut errors);

    errors.into_result(OrderForm {
        patch,
        book_project_id,
        cart_item_id,
    })
}
